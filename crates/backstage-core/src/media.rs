//! Inline base64 images (performance banners, theater photos).

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{Error, Result};

/// Upper bound on the encoded length of an inline image (~5 MB decoded).
pub const MAX_ENCODED_IMAGE_LEN: usize = 7_000_000;

/// Validate an inline image: plain base64 or a
/// `data:<mime>;base64,<payload>` URL, at most [`MAX_ENCODED_IMAGE_LEN`]
/// characters, and decodable.
pub fn validate_base64_image(field: &str, value: &str) -> Result<()> {
  if value.len() > MAX_ENCODED_IMAGE_LEN {
    return Err(Error::validation(format!(
      "{field} is too large ({} characters; limit is {MAX_ENCODED_IMAGE_LEN})",
      value.len()
    )));
  }

  let payload = match value.strip_prefix("data:") {
    Some(rest) => match rest.split_once(";base64,") {
      Some((_, payload)) => payload,
      None => {
        return Err(Error::validation(format!(
          "{field} data URL must use ;base64, encoding"
        )));
      }
    },
    None => value,
  };

  STANDARD.decode(payload).map_err(|e| {
    Error::validation(format!(
      "{field} must be valid base64 (a data URL is accepted): {e}"
    ))
  })?;

  Ok(())
}
