use answerbook_core::{ImageUpload, UpsertRequest};
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use tracing::{debug, trace};

pub const IMAGE_FIELD: &str = "image";

/// Form parts as received, before normalization.
#[derive(Debug, Default)]
pub struct RawForm {
    category: String,
    key: String,
    name: String,
    desc: String,
    image: Option<RawImage>,
}

#[derive(Debug)]
struct RawImage {
    filename: Option<String>,
    bytes: Vec<u8>,
}

impl RawForm {
    /// Repeated text fields are concatenated in arrival order. Unknown fields are ignored.
    pub fn push_text(&mut self, field: &str, value: &str) {
        let target = match field {
            "category" => &mut self.category,
            "key" => &mut self.key,
            "name" => &mut self.name,
            "desc" => &mut self.desc,
            other => {
                trace!(field = other, "Ignoring unknown form field");
                return;
            }
        };
        target.push_str(value);
    }

    /// Only the first image part counts.
    pub fn push_image(&mut self, filename: Option<String>, bytes: Vec<u8>) {
        if self.image.is_none() {
            self.image = Some(RawImage { filename, bytes });
        }
    }

    pub fn into_request(self) -> UpsertRequest {
        let image = self.image.and_then(|raw| {
            let filename = raw.filename.as_deref().map(final_component).unwrap_or_default();
            if raw.bytes.is_empty() && filename.is_empty() {
                // A file input left empty by the browser.
                return None;
            }
            Some(ImageUpload {
                bytes: raw.bytes,
                filename: filename.to_string(),
            })
        });

        UpsertRequest {
            category: self.category,
            key: self.key,
            name: self.name,
            desc: self.desc,
            image,
        }
    }
}

/// Last path component of a client-supplied filename, with either separator.
fn final_component(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename).trim()
}

/// Reads every part of a create-word/update-word form.
pub async fn read_request(mut multipart: Multipart) -> Result<UpsertRequest, MultipartError> {
    let mut form = RawForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == IMAGE_FIELD {
            let filename = field.file_name().map(str::to_owned);
            let bytes = field.bytes().await?;
            debug!(filename = ?filename, bytes = bytes.len(), "Received image part");
            form.push_image(filename, bytes.to_vec());
        } else {
            let value = field.text().await?;
            form.push_text(&name, &value);
        }
    }

    Ok(form.into_request())
}
