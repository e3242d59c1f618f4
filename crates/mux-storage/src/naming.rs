//! Remote artifact naming.
//!
//! Public ids are visible in the hosting service's namespace, so they are
//! random tokens with no relation to the caller's correlation id or the
//! source URL.

use rand::Rng;

/// Length of a generated public id.
pub const PUBLIC_ID_LEN: usize = 12;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Fixed transformation for the poster frame: 2s in, 640x360 fill, auto
/// quality and format.
const THUMBNAIL_TRANSFORM: &str = "so_2,w_640,h_360,c_fill,q_auto,f_auto";

/// Generate a fresh, unguessable public id.
pub fn generate_public_id() -> String {
    random_token(PUBLIC_ID_LEN)
}

/// Random lowercase alphanumeric token of `len` characters.
fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Thumbnail URL derived from the delivery URL convention; no request is made.
pub fn thumbnail_url(cloud_name: &str, public_id: &str) -> String {
    format!(
        "https://res.cloudinary.com/{}/video/upload/{}/{}.jpg",
        cloud_name, THUMBNAIL_TRANSFORM, public_id
    )
}
