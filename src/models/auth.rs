// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session JWT claims. Issued by the login flow, which lives outside this
/// service; here they are only decoded.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // user id
    pub exp: usize,
    pub iat: usize,
}
