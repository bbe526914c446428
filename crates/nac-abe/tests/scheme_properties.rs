//! Scheme-level properties
//!
//! Pairings are expensive, so the property tests run a handful of cases over
//! small trees and a small universe.

use assert_matches::assert_matches;
use nac_abe::{
    decrypt, encrypt, open_content, seal_content, AbeAuthority, Ciphertext, ContentKey,
    DecryptionKey, PublicParams,
};
use bincode::Options;
use nac_core::NacError;
use nac_policy::{
    attribute_set, evaluate, parse, to_bytes, AccessTree, Attribute, AttributeSet, TreeNode,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const UNIVERSE: [&str; 4] = ["attr0", "attr1", "attr2", "attr3"];

fn authority(seed: u64) -> (AbeAuthority, ChaCha20Rng) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let universe = attribute_set(UNIVERSE).unwrap();
    (AbeAuthority::setup(&universe, &mut rng).unwrap(), rng)
}

fn tree_strategy() -> impl Strategy<Value = AccessTree> {
    let leaf = prop::sample::select(UNIVERSE.to_vec())
        .prop_map(|token| AccessTree::leaf(Attribute::new(token).unwrap()));
    leaf.prop_recursive(2, 6, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..3)
                .prop_map(|children| AccessTree::and(children).unwrap()),
            prop::collection::vec(inner.clone(), 2..4)
                .prop_map(|children| AccessTree::or(children).unwrap()),
            prop::collection::vec(inner, 2..4).prop_flat_map(|children| {
                let n = children.len();
                (1..=n).prop_map(move |k| AccessTree::threshold(k, children.clone()).unwrap())
            }),
        ]
    })
}

fn subset_strategy() -> impl Strategy<Value = AttributeSet> {
    prop::sample::subsequence(UNIVERSE.to_vec(), 1..=UNIVERSE.len())
        .prop_map(|tokens| attribute_set(tokens).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn decrypts_iff_policy_satisfied(
        tree in tree_strategy(),
        held in subset_strategy(),
        seed in any::<u64>(),
    ) {
        let (authority, mut rng) = authority(seed);
        let ciphertext = encrypt(authority.public_params(), &tree, b"payload", &mut rng).unwrap();
        let key = authority.keygen(&held, &mut rng).unwrap();

        match decrypt(&key, &ciphertext) {
            Ok(plaintext) => {
                prop_assert!(evaluate(&tree, &held));
                prop_assert_eq!(plaintext, b"payload".to_vec());
            }
            Err(err) => {
                prop_assert!(!evaluate(&tree, &held));
                prop_assert_eq!(err, NacError::PolicyNotSatisfied);
            }
        }
    }

    #[test]
    fn corrupt_ciphertext_bytes_never_panic(flip in 1usize..400, seed in any::<u64>()) {
        let (authority, mut rng) = authority(seed);
        let tree = parse("attr0 and attr1").unwrap();
        let ciphertext = encrypt(authority.public_params(), &tree, b"payload", &mut rng).unwrap();
        let mut bytes = ciphertext.to_bytes().unwrap();
        let position = flip % bytes.len();
        bytes[position] ^= 0x5a;

        if let Ok(corrupt) = Ciphertext::from_bytes(&bytes) {
            let held = attribute_set(["attr0", "attr1"]).unwrap();
            let key = authority.keygen(&held, &mut rng).unwrap();
            let _ = decrypt(&key, &corrupt);
        }
    }
}

#[test]
fn encryption_is_randomized() {
    let (authority, mut rng) = authority(1);
    let tree = parse("attr0 and attr1 or attr2").unwrap();
    let first = encrypt(authority.public_params(), &tree, b"same", &mut rng).unwrap();
    let second = encrypt(authority.public_params(), &tree, b"same", &mut rng).unwrap();
    assert_ne!(first.to_bytes().unwrap(), second.to_bytes().unwrap());

    let key = authority.keygen(&attribute_set(["attr2"]).unwrap(), &mut rng).unwrap();
    assert_eq!(decrypt(&key, &first).unwrap(), b"same");
    assert_eq!(decrypt(&key, &second).unwrap(), b"same");
}

#[test]
fn byte_forms_survive_transport() {
    let (authority, mut rng) = authority(2);
    let public = PublicParams::from_bytes(&authority.public_params().to_bytes().unwrap()).unwrap();
    let tree = parse("2 of (attr0, attr1, attr2)").unwrap();
    let ciphertext = encrypt(&public, &tree, b"moved", &mut rng).unwrap();
    let ciphertext = Ciphertext::from_bytes(&ciphertext.to_bytes().unwrap()).unwrap();
    assert_eq!(ciphertext.policy(), &tree);

    let key = authority.keygen(&attribute_set(["attr0", "attr2"]).unwrap(), &mut rng).unwrap();
    let key = DecryptionKey::from_bytes(&key.to_bytes().unwrap()).unwrap();
    assert_eq!(decrypt(&key, &ciphertext).unwrap(), b"moved");
}

#[test]
fn truncated_ciphertext_is_malformed() {
    let (authority, mut rng) = authority(3);
    let tree = parse("attr0").unwrap();
    let bytes = encrypt(authority.public_params(), &tree, b"x", &mut rng)
        .unwrap()
        .to_bytes()
        .unwrap();
    for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
        assert_matches!(
            Ciphertext::from_bytes(&bytes[..cut]),
            Err(NacError::MalformedCiphertext { .. })
        );
    }
}

#[test]
fn content_key_flow() {
    let (authority, mut rng) = authority(4);
    let content_key = ContentKey::generate(&mut rng);
    let name = b"/producer/dataset1/0";
    let sealed = seal_content(&content_key, b"sensor reading", name, &mut rng).unwrap();

    let tree = parse("attr1 and attr2 or attr3").unwrap();
    let wrapped = encrypt(
        authority.public_params(),
        &tree,
        content_key.as_bytes(),
        &mut rng,
    )
    .unwrap();

    let held = attribute_set(["attr1", "attr2"]).unwrap();
    let key = authority.keygen(&held, &mut rng).unwrap();
    let recovered = ContentKey::from_slice(&decrypt(&key, &wrapped).unwrap()).unwrap();
    assert_eq!(
        open_content(&recovered, &sealed, name).unwrap(),
        b"sensor reading"
    );
}

/// Encoded ciphertext split around its embedded policy body
fn around_policy(seed: u64) -> (Vec<u8>, Vec<u8>) {
    let (authority, mut rng) = authority(seed);
    let tree = parse("attr0 and attr1").unwrap();
    let bytes = encrypt(authority.public_params(), &tree, b"x", &mut rng)
        .unwrap()
        .to_bytes()
        .unwrap();
    let original = &to_bytes(&tree).unwrap()[1..];
    let at = bytes
        .windows(original.len())
        .position(|window| window == original)
        .unwrap();
    (bytes[..at].to_vec(), bytes[at + original.len()..].to_vec())
}

fn with_policy_body(seed: u64, body: &[u8]) -> Vec<u8> {
    let (mut bytes, rest) = around_policy(seed);
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(&rest);
    bytes
}

fn node_body(nodes: &[TreeNode]) -> Vec<u8> {
    bincode::DefaultOptions::new().serialize(nodes).unwrap()
}

fn leaf_node(token: &str) -> TreeNode {
    TreeNode::Leaf(Attribute::new(token).unwrap())
}

#[test]
fn deeply_nested_policy_is_malformed() {
    let mut nodes = vec![leaf_node("attr0")];
    nodes.extend(std::iter::repeat(TreeNode::And { arity: 1 }).take(200_000));
    let bytes = with_policy_body(5, &node_body(&nodes));
    assert_matches!(
        Ciphertext::from_bytes(&bytes),
        Err(NacError::MalformedCiphertext { .. })
    );
}

#[test]
fn policy_gate_without_operands_is_malformed() {
    let nodes = [leaf_node("attr0"), leaf_node("attr1"), TreeNode::And { arity: 3 }];
    let bytes = with_policy_body(6, &node_body(&nodes));
    assert_matches!(
        Ciphertext::from_bytes(&bytes),
        Err(NacError::MalformedCiphertext { .. })
    );
}

#[test]
fn policy_threshold_above_operands_is_malformed() {
    let nodes = [
        leaf_node("attr0"),
        leaf_node("attr1"),
        TreeNode::Threshold {
            threshold: 3,
            arity: 2,
        },
    ];
    let bytes = with_policy_body(7, &node_body(&nodes));
    assert_matches!(
        Ciphertext::from_bytes(&bytes),
        Err(NacError::MalformedCiphertext { .. })
    );
}

#[test]
fn policy_length_beyond_input_is_malformed() {
    let (mut bytes, _) = around_policy(8);
    bytes.push(200);
    assert_matches!(
        Ciphertext::from_bytes(&bytes),
        Err(NacError::MalformedCiphertext { .. })
    );
}
