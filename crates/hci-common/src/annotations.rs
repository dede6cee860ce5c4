//! Annotation accessors for provider bookkeeping on managed resources
//!
//! The typed spec/status of a resource has no room for ad-hoc provider state,
//! so providers stash it in the object's annotations instead. Two layers live
//! here:
//!
//! - string values stored directly under a key
//! - JSON objects encoded into a single string slot
//!
//! Accessors only touch the in-memory object. Persisting it back to the API
//! server (and handling write conflicts) is the caller's job.
//!
//! # Example
//!
//! ```ignore
//! use hci_common::annotations::{AnnotationContent, AnnotationExt};
//!
//! let mut content = AnnotationContent::new();
//! content.insert("replicas".into(), 3.into());
//! machine.set_annotation_json("example.io/state", &content)?;
//!
//! // Absent and empty annotations both read back as `{}`
//! let state = machine.annotation_json("example.io/state")?;
//! ```

use std::collections::BTreeMap;

use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Annotation map as carried by `ObjectMeta`
pub type AnnotationMap = BTreeMap<String, String>;

/// Structured value stored in a JSON annotation
pub type AnnotationContent = Map<String, Value>;

/// Errors from encoding or decoding a JSON annotation
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// The value could not be serialized to JSON
    #[error("failed to encode annotation {key}: {source}")]
    Encode {
        /// Annotation key being written
        key: String,
        /// Underlying serializer error
        source: serde_json::Error,
    },

    /// The value serialized to something other than a JSON object
    #[error("annotation {key} must encode to a JSON object")]
    NotAnObject {
        /// Annotation key being written
        key: String,
    },

    /// The stored text is not valid JSON, or not a JSON object
    #[error("failed to decode annotation {key}: {source}")]
    Decode {
        /// Annotation key being read
        key: String,
        /// Underlying deserializer error
        source: serde_json::Error,
    },
}

impl AnnotationError {
    /// The annotation key the error refers to
    pub fn key(&self) -> &str {
        match self {
            AnnotationError::Encode { key, .. }
            | AnnotationError::NotAnObject { key }
            | AnnotationError::Decode { key, .. } => key,
        }
    }

    /// True if the error happened while writing
    pub fn is_encode(&self) -> bool {
        matches!(
            self,
            AnnotationError::Encode { .. } | AnnotationError::NotAnObject { .. }
        )
    }

    /// True if the stored text could not be read back
    pub fn is_decode(&self) -> bool {
        matches!(self, AnnotationError::Decode { .. })
    }

    fn encode(key: &str, source: serde_json::Error) -> Self {
        AnnotationError::Encode {
            key: key.to_string(),
            source,
        }
    }

    fn decode(key: &str, source: serde_json::Error) -> Self {
        AnnotationError::Decode {
            key: key.to_string(),
            source,
        }
    }
}

/// Access to an object's annotation map.
///
/// A resource may carry no annotations at all (`None`), which is distinct
/// from an empty map on the wire but reads the same through the accessors.
pub trait Annotated {
    /// The current annotations, or `None` if the object has none
    fn annotation_map(&self) -> Option<&AnnotationMap>;

    /// Mutable annotations, allocating an empty map if the object has none
    fn annotation_map_mut(&mut self) -> &mut AnnotationMap;
}

impl<K: Resource> Annotated for K {
    fn annotation_map(&self) -> Option<&AnnotationMap> {
        self.meta().annotations.as_ref()
    }

    fn annotation_map_mut(&mut self) -> &mut AnnotationMap {
        self.meta_mut()
            .annotations
            .get_or_insert_with(AnnotationMap::new)
    }
}

/// String and JSON accessors for a single annotation key.
///
/// Implemented for everything that is [`Annotated`], which covers every
/// `kube::Resource`.
pub trait AnnotationExt: Annotated {
    /// The string stored at `key`, or `""` if it is not set
    fn annotation(&self, key: &str) -> &str {
        self.annotation_map()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Store `value` at `key`, overwriting any previous value.
    ///
    /// Other annotations are left untouched.
    fn set_annotation(&mut self, key: &str, value: impl Into<String>) {
        self.annotation_map_mut()
            .insert(key.to_string(), value.into());
    }

    /// Decode the JSON object stored at `key`.
    ///
    /// A missing or empty annotation yields an empty object. Text that is not
    /// a JSON object is an error; use `.unwrap_or_default()` to treat
    /// corruption the same as absence.
    fn annotation_json(&self, key: &str) -> Result<AnnotationContent, AnnotationError> {
        let text = self.annotation(key);
        if text.is_empty() {
            return Ok(AnnotationContent::new());
        }
        serde_json::from_str(text).map_err(|e| AnnotationError::decode(key, e))
    }

    /// Encode `content` as JSON and store it at `key`.
    ///
    /// The annotation is only written once encoding succeeds.
    fn set_annotation_json(
        &mut self,
        key: &str,
        content: &AnnotationContent,
    ) -> Result<(), AnnotationError> {
        let text = serde_json::to_string(content).map_err(|e| AnnotationError::encode(key, e))?;
        self.set_annotation(key, text);
        Ok(())
    }

    /// Decode the JSON object stored at `key` into `T`.
    ///
    /// A missing or empty annotation yields `T::default()`.
    fn annotation_json_as<T>(&self, key: &str) -> Result<T, AnnotationError>
    where
        T: DeserializeOwned + Default,
    {
        if self.annotation(key).is_empty() {
            return Ok(T::default());
        }
        let content = self.annotation_json(key)?;
        serde_json::from_value(Value::Object(content)).map_err(|e| AnnotationError::decode(key, e))
    }

    /// Encode `content` as a JSON object and store it at `key`.
    ///
    /// Values that fail to serialize, or that serialize to anything but an
    /// object, leave the annotations untouched.
    fn set_annotation_json_as<T>(&mut self, key: &str, content: &T) -> Result<(), AnnotationError>
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(content).map_err(|e| AnnotationError::encode(key, e))? {
            Value::Object(content) => self.set_annotation_json(key, &content),
            _ => Err(AnnotationError::NotAnObject {
                key: key.to_string(),
            }),
        }
    }
}

impl<T: Annotated + ?Sized> AnnotationExt for T {}
