/// Proof-of-work answers for the web chat endpoint's challenge
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{error, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::api;

pub const CHALLENGE_URL: &str = "https://chat.deepseek.com/api/v0/pow/challenge";
pub const DEFAULT_TARGET_PATH: &str = "/api/v0/chat/completion";
pub const ALGORITHM: &str = "DeepSeekHashV1";
pub const MAX_ATTEMPTS: u64 = 100_000;

const DIFFICULTY_PREFIX: &str = "0000";

#[derive(Debug, Error)]
pub enum PowError {
    #[error("failed to get challenge: {0}")]
    Challenge(#[from] api::ApiError),
    #[error("malformed challenge: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Challenge {
    pub challenge: String,
    pub salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowResponse {
    pub algorithm: String,
    pub challenge: String,
    pub salt: String,
    pub answer: u64,
    pub signature: String,
    pub target_path: String,
}

impl PowResponse {
    /// Header value: base64 of the JSON body
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

fn sha256_hex(message: &str) -> String {
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// First nonce whose hash has the difficulty prefix; 0 when none is found
/// within `max_attempts`
pub fn solve(challenge: &str, salt: &str, target_path: &str, max_attempts: u64) -> PowResponse {
    let answer = (0..max_attempts)
        .find(|i| sha256_hex(&format!("{}{}{}", challenge, salt, i)).starts_with(DIFFICULTY_PREFIX))
        .unwrap_or(0);

    PowResponse {
        algorithm: ALGORITHM.to_string(),
        challenge: challenge.to_string(),
        salt: salt.to_string(),
        answer,
        signature: sha256_hex(&format!("{}{}{}", challenge, salt, answer)),
        target_path: target_path.to_string(),
    }
}

/// Fetch a challenge and return the encoded answer
pub async fn generate_pow_response(target_path: &str) -> Result<String, PowError> {
    let body = api::fetch_json(CHALLENGE_URL).await?;
    let challenge: Challenge = serde_json::from_value(body)?;

    let response = solve(&challenge.challenge, &challenge.salt, target_path, MAX_ATTEMPTS);
    info!("Solved proof-of-work with answer {}", response.answer);

    response.encode().map_err(|e| {
        error!("Failed to encode proof-of-work: {}", e);
        PowError::Malformed(e)
    })
}
