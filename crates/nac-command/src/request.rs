//! Signed command requests
//!
//! Name layout:
//!
//! ```text
//! <target...>/<OPERATION>/<data prefix...>/<payload>/<signature info>
//! ```
//!
//! For example a Data Owner setting a policy on a Producer sends
//! `/producer/SET_POLICY/dataset1/example/attr1 and attr2 or attr3/<sig>`.
//! The operation always sits right after the target prefix, the payload and
//! the signature are always the last two components, and everything in
//! between is the data prefix.

use crate::identity::{Certificate, Signer};
use crate::operation::Operation;
use crate::signature::{sign, verify, SignatureInfo, SignedKind};
use nac_core::{Clock, Component, Name, NacError, Result};

/// A command as sent on the wire and as seen by its handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    name: Name,
    target: Name,
    operation: Operation,
    data_prefix: Name,
    payload: Component,
    signature: SignatureInfo,
}

/// Build and sign a command for `target`
pub fn build_request(
    target: &Name,
    operation: Operation,
    data_prefix: &Name,
    payload: impl Into<Vec<u8>>,
    signer: &dyn Signer,
    clock: &dyn Clock,
) -> Result<CommandRequest> {
    let payload = Component::new(payload.into());
    let unsigned = target
        .clone()
        .append(operation.component())
        .append_name(data_prefix)
        .append(payload.clone());

    let signature = sign(
        SignedKind::Request,
        &[unsigned.encode().as_slice()],
        signer,
        clock.now_ms(),
        rand::random(),
    );
    let name = unsigned.append(signature.to_component()?);

    tracing::trace!(name = %name, operation = %operation, "Built signed command");

    Ok(CommandRequest {
        name,
        target: target.clone(),
        operation,
        data_prefix: data_prefix.clone(),
        payload,
        signature,
    })
}

/// Split a received command name addressed to `target`
///
/// Only checks structure; call [`CommandRequest::verify`] with the signer's
/// certificate before acting on it.
pub fn parse_request(name: &Name, target: &Name) -> Result<CommandRequest> {
    if !target.is_prefix_of(name) {
        return Err(NacError::invalid(format!("{name} is not addressed to {target}")));
    }
    if name.len() < target.len() + 3 {
        return Err(NacError::invalid(format!(
            "command {name} is too short: needs operation, payload and signature"
        )));
    }

    let op_index = target.len();
    let payload_index = name.len() - 2;
    let operation = name
        .get(op_index)
        .ok_or_else(|| NacError::invalid("missing operation component"))
        .and_then(Operation::from_component)?;
    let payload = name
        .get(payload_index)
        .cloned()
        .ok_or_else(|| NacError::invalid("missing payload component"))?;
    let signature = name
        .get(payload_index + 1)
        .ok_or_else(|| NacError::signature_invalid("missing signature component"))
        .and_then(SignatureInfo::from_component)?;

    Ok(CommandRequest {
        name: name.clone(),
        target: target.clone(),
        operation,
        data_prefix: name.slice(op_index + 1, payload_index),
        payload,
        signature,
    })
}

impl CommandRequest {
    /// Full signed name
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Prefix of the node the command is addressed to
    pub fn target(&self) -> &Name {
        &self.target
    }

    /// Requested operation
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Data prefix the command concerns; may be empty
    pub fn data_prefix(&self) -> &Name {
        &self.data_prefix
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    /// Payload as UTF-8 text, e.g. policy text for `SET_POLICY`
    pub fn payload_text(&self) -> Result<&str> {
        std::str::from_utf8(self.payload.as_bytes())
            .map_err(|_| NacError::invalid(format!("{} payload is not UTF-8", self.operation)))
    }

    /// Signature metadata
    pub fn signature(&self) -> &SignatureInfo {
        &self.signature
    }

    /// Key locator of the signer
    pub fn key_locator(&self) -> &Name {
        &self.signature.key_locator
    }

    /// Identity the signer claims to be
    pub fn signer_identity(&self) -> Result<Name> {
        self.signature
            .signer_identity()
            .ok_or_else(|| NacError::signature_invalid("malformed key locator"))
    }

    /// Name without its signature component
    pub fn unsigned_name(&self) -> Name {
        self.name.prefix(self.name.len().saturating_sub(1))
    }

    /// Verify the signature against the claimed signer's certificate
    pub fn verify(&self, certificate: &Certificate) -> Result<()> {
        verify(
            SignedKind::Request,
            &[self.unsigned_name().encode().as_slice()],
            &self.signature,
            certificate,
        )
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

    fn owner() -> Ed25519Identity {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        Ed25519Identity::generate(Name::from_uri("/owner").unwrap(), &mut rng)
    }

    fn set_policy(signer: &Ed25519Identity) -> CommandRequest {
        build_request(
            &Name::from_uri("/producer").unwrap(),
            Operation::SetPolicy,
            &Name::from_uri("/dataset1/example").unwrap(),
            "attr1 and attr2 or attr3",
            signer,
            &ManualClock::new(1_000),
        )
        .unwrap()
    }

    #[test]
    fn test_name_layout() {
        let request = set_policy(&owner());
        let name = request.name();
        assert_eq!(name.len(), 6);
        let uri = name.prefix(5).to_uri();
        assert_eq!(uri, "/producer/SET_POLICY/dataset1/example/attr1%20and%20attr2%20or%20attr3");
    }

    #[test]
    fn test_parse_recovers_fields() {
        let signer = owner();
        let sent = set_policy(&signer);
        let parsed = parse_request(sent.name(), &Name::from_uri("/producer").unwrap()).unwrap();
        assert_eq!(parsed, sent);
        assert_eq!(parsed.operation(), Operation::SetPolicy);
        assert_eq!(parsed.data_prefix().to_uri(), "/dataset1/example");
        assert_eq!(parsed.payload_text().unwrap(), "attr1 and attr2 or attr3");
        assert_eq!(parsed.signer_identity().unwrap(), *signer.identity());
        assert!(parsed.verify(signer.certificate()).is_ok());
    }

    #[test]
    fn test_empty_data_prefix() {
        let signer = owner();
        let sent = build_request(
            &Name::from_uri("/authority").unwrap(),
            Operation::FetchPublicParams,
            &Name::new(),
            Vec::new(),
            &signer,
            &ManualClock::new(5),
        )
        .unwrap();
        let parsed = parse_request(sent.name(), &Name::from_uri("/authority").unwrap()).unwrap();
        assert!(parsed.data_prefix().is_empty());
        assert!(parsed.payload().is_empty());
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let signer = owner();
        let sent = set_policy(&signer);
        let mut components: Vec<Component> = sent.name().components().to_vec();
        components[4] = Component::from("attr3");
        let tampered = Name::from_components(components);
        let parsed = parse_request(&tampered, &Name::from_uri("/producer").unwrap()).unwrap();
        assert_matches!(
            parsed.verify(signer.certificate()),
            Err(NacError::SignatureInvalid { .. })
        );
    }

    #[test]
    fn test_identical_commands_have_distinct_names() {
        let signer = owner();
        assert_ne!(set_policy(&signer).name(), set_policy(&signer).name());
    }

    #[test]
    fn test_structural_errors() {
        let target = Name::from_uri("/producer").unwrap();
        let foreign = Name::from_uri("/other/SET_POLICY/a/b").unwrap();
        assert!(parse_request(&foreign, &target).is_err());
        let truncated = Name::from_uri("/producer/SET_POLICY/a").unwrap();
        assert!(parse_request(&truncated, &target).is_err());
        assert_matches!(
            parse_request(&Name::from_uri("/producer/DELETE/a/b").unwrap(), &target),
            Err(NacError::Invalid { .. })
        );
        assert_matches!(
            parse_request(&Name::from_uri("/producer/SET_POLICY/a/b").unwrap(), &target),
            Err(NacError::SignatureInvalid { .. })
        );
    }
}
