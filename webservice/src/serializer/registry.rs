use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Format;
use crate::error::SerializationError;

type Encode<T> = fn(&T) -> Result<String, SerializationError>;
type Decode<T> = fn(&str) -> Result<T, SerializationError>;

/// Encodes and decodes one type in one [`Format`].
pub struct TypeSerializer<T> {
    format: Format,
    encode: Encode<T>,
    decode: Decode<T>,
}

impl<T> TypeSerializer<T> {
    /// A serializer backed by custom functions.
    pub fn new(format: Format, encode: Encode<T>, decode: Decode<T>) -> Self {
        Self {
            format,
            encode,
            decode,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn encode(&self, value: &T) -> Result<String, SerializationError> {
        (self.encode)(value)
    }

    pub fn decode(&self, text: &str) -> Result<T, SerializationError> {
        (self.decode)(text)
    }
}

impl<T: Serialize + DeserializeOwned> TypeSerializer<T> {
    pub fn json() -> Self {
        Self::new(
            Format::Json,
            |value| Ok(serde_json::to_string(value)?),
            |text| Ok(serde_json::from_str(text)?),
        )
    }

    /// XML with the type name as root element.
    pub fn xml() -> Self {
        Self::new(
            Format::Xml,
            |value| Ok(quick_xml::se::to_string(value)?),
            |text| Ok(quick_xml::de::from_str(text)?),
        )
    }
}

impl<T> Clone for TypeSerializer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypeSerializer<T> {}

impl<T> fmt::Debug for TypeSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSerializer")
            .field("type", &type_name::<T>())
            .field("format", &self.format)
            .finish()
    }
}

/// Serializers keyed by the type they handle.
///
/// ## Examples
///
/// ```rust
/// use webservice::serializer::{Format, SerializerRegistry};
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Issue { key: String }
///
/// let registry = SerializerRegistry::new().with_json::<Issue>();
/// let serializer = registry.get::<Issue>().unwrap();
/// assert_eq!(serializer.format(), Format::Json);
/// assert!(registry.get::<String>().is_err());
/// ```
#[derive(Default)]
pub struct SerializerRegistry {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `serializer` for `T`, replacing an earlier registration.
    pub fn register<T: 'static>(&mut self, serializer: TypeSerializer<T>) {
        if self
            .entries
            .insert(TypeId::of::<T>(), Box::new(serializer))
            .is_none()
        {
            self.names.push(type_name::<T>());
        }
    }

    #[must_use]
    pub fn with<T: 'static>(mut self, serializer: TypeSerializer<T>) -> Self {
        self.register(serializer);
        self
    }

    #[must_use]
    pub fn with_json<T: Serialize + DeserializeOwned + 'static>(self) -> Self {
        self.with(TypeSerializer::<T>::json())
    }

    #[must_use]
    pub fn with_xml<T: Serialize + DeserializeOwned + 'static>(self) -> Self {
        self.with(TypeSerializer::<T>::xml())
    }

    /// The serializer registered for `T`.
    ///
    /// ## Errors
    ///
    /// Returns [`SerializationError::Unregistered`] when `T` has none.
    pub fn get<T: 'static>(&self) -> Result<&TypeSerializer<T>, SerializationError> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<TypeSerializer<T>>())
            .ok_or(SerializationError::Unregistered {
                type_name: type_name::<T>(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("types", &self.names)
            .finish()
    }
}
