//! Signed replies and outcome classification
//!
//! A reply reuses the request name, carries a [`ReplyContent`] and is signed
//! by the node that handled the command. Peers that answer with the bare
//! literals `success` or `exist` are still understood.

use crate::identity::{Certificate, Signer};
use crate::signature::{sign, verify, SignatureInfo, SignedKind};
use bincode::Options;
use nac_core::{Clock, Name, NacError, Result};
use serde::{Deserialize, Serialize};

/// Legacy literal content meaning success
pub const LEGACY_SUCCESS: &[u8] = b"success";
/// Legacy literal content meaning "already exists"
pub const LEGACY_EXISTS: &[u8] = b"exist";

const MAX_REPLY_CONTENT_BYTES: u64 = 8 * 1024 * 1024;

/// Result class reported by the handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    /// The command took effect
    Success,
    /// The command was a duplicate of existing state
    AlreadyExists,
    /// The command was refused
    Failed {
        /// Human-readable reason
        reason: String,
    },
}

/// Structured reply payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContent {
    /// Result class
    pub status: ReplyStatus,
    /// Operation-specific body, e.g. encoded parameters or content
    pub body: Vec<u8>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_REPLY_CONTENT_BYTES)
        .reject_trailing_bytes()
}

impl ReplyContent {
    /// Successful reply with a body
    pub fn success(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: ReplyStatus::Success,
            body: body.into(),
        }
    }

    /// Duplicate-submission reply
    pub fn already_exists() -> Self {
        Self {
            status: ReplyStatus::AlreadyExists,
            body: Vec::new(),
        }
    }

    /// Refusal with a reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Failed {
                reason: reason.into(),
            },
            body: Vec::new(),
        }
    }

    /// Encode as reply content bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(options().serialize(self)?)
    }

    /// Interpret reply content bytes, accepting the legacy literals
    pub fn classify(content: &[u8]) -> Self {
        if content == LEGACY_SUCCESS {
            return Self::success(Vec::new());
        }
        if content == LEGACY_EXISTS {
            return Self::already_exists();
        }
        options().deserialize(content).unwrap_or_else(|_| {
            Self::failed(String::from_utf8_lossy(content).into_owned())
        })
    }
}

/// Verified result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Success with the reply body
    Success(Vec<u8>),
    /// The target already held this state
    AlreadyExists(String),
    /// The target refused the command
    OperationFailed(String),
}

/// A signed reply packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    name: Name,
    content: Vec<u8>,
    signature: SignatureInfo,
}

/// Build a signed reply to the command named `request_name`
pub fn build_reply(
    request_name: &Name,
    content: &ReplyContent,
    signer: &dyn Signer,
    clock: &dyn Clock,
) -> Result<Reply> {
    let bytes = content.to_bytes()?;
    Ok(build_raw_reply(request_name, bytes, signer, clock))
}

/// Build a signed reply with arbitrary content bytes
pub fn build_raw_reply(
    request_name: &Name,
    content: Vec<u8>,
    signer: &dyn Signer,
    clock: &dyn Clock,
) -> Reply {
    let signature = sign(
        SignedKind::Reply,
        &[request_name.encode().as_slice(), content.as_slice()],
        signer,
        clock.now_ms(),
        rand::random(),
    );
    Reply {
        name: request_name.clone(),
        content,
        signature,
    }
}

/// Verify a reply against the certificate of the node the command targeted
/// and classify it
///
/// A reply signed by anyone else, or with a bad signature, is
/// [`NacError::SignatureInvalid`] and its content is never interpreted.
pub fn parse_reply(reply: &Reply, expected: &Certificate) -> Result<Outcome> {
    verify(
        SignedKind::Reply,
        &[reply.name.encode().as_slice(), reply.content.as_slice()],
        &reply.signature,
        expected,
    )?;

    let content = ReplyContent::classify(&reply.content);
    Ok(match content.status {
        ReplyStatus::Success => Outcome::Success(content.body),
        ReplyStatus::AlreadyExists => Outcome::AlreadyExists(if content.body.is_empty() {
            "already exists".to_string()
        } else {
            String::from_utf8_lossy(&content.body).into_owned()
        }),
        ReplyStatus::Failed { reason } => Outcome::OperationFailed(reason),
    })
}

impl Reply {
    /// Name of the command this reply answers
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Raw content bytes
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Signature metadata
    pub fn signature(&self) -> &SignatureInfo {
        &self.signature
    }
}

/// Convenience: reject unexpected content with a uniform error
pub fn expect_success(outcome: Outcome) -> Result<Vec<u8>> {
    match outcome {
        Outcome::Success(body) => Ok(body),
        Outcome::AlreadyExists(reason) | Outcome::OperationFailed(reason) => {
            Err(NacError::operation_failed(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Ed25519Identity;
    use assert_matches::assert_matches;
    use nac_core::ManualClock;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn producer(seed: u64) -> Ed25519Identity {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        Ed25519Identity::generate(Name::from_uri("/producer").unwrap(), &mut rng)
    }

    fn request_name() -> Name {
        Name::from_uri("/producer/SET_POLICY/dataset1/p/sig").unwrap()
    }

    #[test]
    fn test_outcomes() {
        let signer = producer(1);
        let clock = ManualClock::new(0);
        let cases = [
            (ReplyContent::success(b"body".to_vec()), Outcome::Success(b"body".to_vec())),
            (ReplyContent::already_exists(), Outcome::AlreadyExists("already exists".into())),
            (ReplyContent::failed("bad policy"), Outcome::OperationFailed("bad policy".into())),
        ];
        for (content, expected) in cases {
            let reply = build_reply(&request_name(), &content, &signer, &clock).unwrap();
            assert_eq!(reply.name(), &request_name());
            assert_eq!(parse_reply(&reply, signer.certificate()).unwrap(), expected);
        }
    }

    #[test]
    fn test_legacy_literals() {
        let signer = producer(2);
        let clock = ManualClock::new(0);
        let reply = build_raw_reply(&request_name(), b"success".to_vec(), &signer, &clock);
        assert_eq!(
            parse_reply(&reply, signer.certificate()).unwrap(),
            Outcome::Success(Vec::new())
        );
        let reply = build_raw_reply(&request_name(), b"exist".to_vec(), &signer, &clock);
        assert_matches!(
            parse_reply(&reply, signer.certificate()).unwrap(),
            Outcome::AlreadyExists(_)
        );
        let reply = build_raw_reply(&request_name(), b"nope".to_vec(), &signer, &clock);
        assert_eq!(
            parse_reply(&reply, signer.certificate()).unwrap(),
            Outcome::OperationFailed("nope".into())
        );
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let signer = producer(3);
        let impostor = producer(4);
        let content = ReplyContent::success(Vec::new());
        let reply =
            build_reply(&request_name(), &content, &impostor, &ManualClock::new(0)).unwrap();
        assert_matches!(
            parse_reply(&reply, signer.certificate()),
            Err(NacError::SignatureInvalid { .. })
        );
    }

    #[test]
    fn test_tampered_content_rejected() {
        let signer = producer(5);
        let content = ReplyContent::failed("no");
        let mut reply =
            build_reply(&request_name(), &content, &signer, &ManualClock::new(0)).unwrap();
        reply.content = ReplyContent::success(Vec::new()).to_bytes().unwrap();
        assert_matches!(
            parse_reply(&reply, signer.certificate()),
            Err(NacError::SignatureInvalid { .. })
        );
    }

    #[test]
    fn test_expect_success() {
        assert_eq!(expect_success(Outcome::Success(vec![1])).unwrap(), vec![1]);
        assert_matches!(
            expect_success(Outcome::OperationFailed("x".into())),
            Err(NacError::OperationFailed { .. })
        );
    }
}
