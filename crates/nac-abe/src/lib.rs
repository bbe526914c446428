//! NAC ABE: ciphertext-policy attribute-based encryption
//!
//! A BSW07-style scheme over the `rabe-bn` BN254 pairing with a bounded
//! attribute universe. An [`AbeAuthority`] runs setup and issues
//! [`DecryptionKey`]s; anyone with the [`PublicParams`] can [`encrypt`] under
//! an access tree; [`decrypt`] succeeds exactly when the key's attributes
//! satisfy the tree.
//!
//! Payload bytes are sealed with ChaCha20-Poly1305. Producers usually encrypt
//! a short random [`ContentKey`] under the policy and seal the content itself
//! with [`seal_content`].
//!
//! ```
//! use nac_abe::{decrypt, encrypt, AbeAuthority};
//! use nac_policy::{attribute_set, parse};
//!
//! let mut rng = rand::thread_rng();
//! let universe = attribute_set(["attr1", "attr2", "attr3"]).unwrap();
//! let authority = AbeAuthority::setup(&universe, &mut rng).unwrap();
//!
//! let policy = parse("attr1 and attr2 or attr3").unwrap();
//! let ciphertext = encrypt(authority.public_params(), &policy, b"hello", &mut rng).unwrap();
//!
//! let key = authority.keygen(&attribute_set(["attr3"]).unwrap(), &mut rng).unwrap();
//! assert_eq!(decrypt(&key, &ciphertext).unwrap(), b"hello");
//! ```

pub mod authority;
pub mod ciphertext;
pub mod encoding;
pub mod keys;
pub mod params;
pub mod sealing;
mod sharing;

pub use authority::AbeAuthority;
pub use ciphertext::{decrypt, encrypt, Ciphertext, LeafShare};
pub use keys::{keygen, AttributeKeyShare, DecryptionKey};
pub use params::{setup, MasterParams, ParamsId, PublicParams};
pub use sealing::{open_content, seal_content, ContentKey, SealedBox};
