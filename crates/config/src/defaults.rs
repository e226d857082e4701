//! Starter configuration written when no file exists

use rand::Rng;
use types::utils::{random_string_with, replace_placeholders};

/// Length of each generated secret
pub const SECRET_LENGTH: usize = 64;

const DEFAULT_TEMPLATE: &str = "[System]
Mode = master
Listen = :5212
SessionSecret = {SessionSecret}
HashIDSalt = {HashIDSalt}
";

/// Starter configuration with fresh secrets
pub fn default_content() -> String {
    default_content_with(&mut rand::thread_rng())
}

/// Starter configuration with secrets drawn from `rng`
pub fn default_content_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let session_secret = random_string_with(rng, SECRET_LENGTH);
    let hash_id_salt = random_string_with(rng, SECRET_LENGTH);

    replace_placeholders(
        DEFAULT_TEMPLATE,
        &[
            ("{SessionSecret}", session_secret.as_str()),
            ("{HashIDSalt}", hash_id_salt.as_str()),
        ],
    )
}
