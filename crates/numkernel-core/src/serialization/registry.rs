//! Process-wide tag registry for polymorphic decoding

use super::{Decoder, Envelope, Serializable};
use crate::bundle::{PartialResult, ResultBundle};
use crate::error::{Error, Result};
use crate::table::{CsrTable, DenseTable};
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

type DecodeFn = fn(&mut Decoder<'_>) -> Result<Box<dyn Envelope>>;

#[derive(Clone, Copy)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

fn decode_boxed<S: Serializable>(input: &mut Decoder<'_>) -> Result<Box<dyn Envelope>> {
    Ok(Box::new(S::decode_fields(input)?))
}

fn registration<S: Serializable>() -> Registration {
    Registration {
        type_id: TypeId::of::<S>(),
        type_name: std::any::type_name::<S>(),
        decode: decode_boxed::<S>,
    }
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<u32, Registration>> = {
        let core = [
            (DenseTable::<f32>::TAG, registration::<DenseTable<f32>>()),
            (DenseTable::<f64>::TAG, registration::<DenseTable<f64>>()),
            (CsrTable::<f32>::TAG, registration::<CsrTable<f32>>()),
            (CsrTable::<f64>::TAG, registration::<CsrTable<f64>>()),
            (PartialResult::<f32>::TAG, registration::<PartialResult<f32>>()),
            (PartialResult::<f64>::TAG, registration::<PartialResult<f64>>()),
            (ResultBundle::<f32>::TAG, registration::<ResultBundle<f32>>()),
            (ResultBundle::<f64>::TAG, registration::<ResultBundle<f64>>()),
        ];
        RwLock::new(core.into_iter().collect())
    };
}

/// Make `S` decodable through [`decode_any`](super::decode_any)
///
/// Registering the same type again is a no-op. A tag already owned by a
/// different type fails with [`Error::DuplicateSerializationTag`].
pub fn register<S: Serializable>() -> Result<()> {
    let mut registry = REGISTRY.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = registry.get(&S::TAG) {
        if existing.type_id == TypeId::of::<S>() {
            return Ok(());
        }
        log::warn!(
            "serialization tag {:#06x} requested by {} is owned by {}",
            S::TAG,
            std::any::type_name::<S>(),
            existing.type_name
        );
        return Err(Error::DuplicateSerializationTag(S::TAG));
    }
    registry.insert(S::TAG, registration::<S>());
    log::debug!(
        "registered serialization tag {:#06x} for {}",
        S::TAG,
        std::any::type_name::<S>()
    );
    Ok(())
}

/// Whether a factory exists for `tag`
pub fn is_registered(tag: u32) -> bool {
    REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains_key(&tag)
}

/// Every registered tag, ascending
pub fn registered_tags() -> Vec<u32> {
    let mut tags: Vec<u32> = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .keys()
        .copied()
        .collect();
    tags.sort_unstable();
    tags
}

pub(super) fn decoder_for(tag: u32) -> Result<DecodeFn> {
    REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&tag)
        .map(|r| r.decode)
        .ok_or(Error::UnknownSerializationTag(tag))
}
