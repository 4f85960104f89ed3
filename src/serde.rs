//! [`serde`](https://serde.rs/) support.
//!
//! Supported types for serialization & deserialization are [`LockId`], [`StreamId`],
//! [`Envelope`], and [`Locator`]. Secret keys are deliberately left out; export them through
//! [`KeyMaterial::encode`](crate::keys::KeyMaterial::encode) instead.
//!
//! If the serializer is human-readable, each type serializes as the same string it displays as:
//! base64 for a `LockId`, base58 for a `StreamId`, gist text for an `Envelope`, and the locator
//! string for a `Locator`. Otherwise the first three serialize as bytes (an `Envelope` as
//! `nonce || ciphertext`), while a `Locator` stays a string.

use crate::{envelope::Envelope, lock::LockId, locator::Locator, stream::StreamId};

use serde::{
    de::{Deserialize, Deserializer, Error, Visitor},
    ser::{Serialize, Serializer},
};
use serde_bytes::Bytes;
use std::{convert::TryFrom, fmt};

impl Serialize for LockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base64())
        } else {
            Bytes::new(self.raw_public_key()).serialize(serializer)
        }
    }
}

impl Serialize for StreamId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            Bytes::new(self.raw_identifier()).serialize(serializer)
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_text())
        } else {
            Bytes::new(&self.to_bytes()).serialize(serializer)
        }
    }
}

impl Serialize for Locator {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LockId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LockIdVisitor;

        impl<'de> Visitor<'de> for LockIdVisitor {
            type Value = LockId;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "LockId as a base64 string or 32 raw bytes")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                LockId::from_base64(v).map_err(E::custom)
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                LockId::try_from(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(LockIdVisitor)
        } else {
            deserializer.deserialize_bytes(LockIdVisitor)
        }
    }
}

impl<'de> Deserialize<'de> for StreamId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StreamIdVisitor;

        impl<'de> Visitor<'de> for StreamIdVisitor {
            type Value = StreamId;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "StreamId as a base58 string or 32 raw bytes")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                StreamId::from_base58(v).map_err(E::custom)
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                StreamId::try_from(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(StreamIdVisitor)
        } else {
            deserializer.deserialize_bytes(StreamIdVisitor)
        }
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EnvelopeVisitor;

        impl<'de> Visitor<'de> for EnvelopeVisitor {
            type Value = Envelope;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "Envelope as gist text or raw nonce and ciphertext bytes")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Envelope::from_text(v).map_err(E::custom)
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Envelope::from_bytes(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(EnvelopeVisitor)
        } else {
            deserializer.deserialize_bytes(EnvelopeVisitor)
        }
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LocatorVisitor;

        impl<'de> Visitor<'de> for LocatorVisitor {
            type Value = Locator;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "Locator string")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Locator::decode(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(LocatorVisitor)
    }
}
