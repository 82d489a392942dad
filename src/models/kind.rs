use super::entity::{AttrValue, ModelError};

/// The declared value type of a kind attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Str,
    Int,
    Float,
    StrList,
}

impl AttrType {
    /// Default value a fresh entity starts with for this type.
    pub fn default_value(self) -> AttrValue {
        match self {
            Self::Str => AttrValue::Str(String::new()),
            Self::Int => AttrValue::Int(0),
            Self::Float => AttrValue::Float(0.0),
            Self::StrList => AttrValue::StrList(Vec::new()),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Str => "a string",
            Self::Int => "an integer",
            Self::Float => "a float",
            Self::StrList => "a string list",
        }
    }
}

/// One declared attribute of a kind.
#[derive(Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: AttrType,
}

/// Schema for one entity kind: its case-sensitive name and declared
/// attribute set. Kinds differ only in this schema; identity and timestamp
/// behavior is shared by every kind.
#[derive(Debug, PartialEq)]
pub struct KindSpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl KindSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The closed set of domain kinds, in registration order.
pub static BUILTIN_KINDS: &[KindSpec] = &[
    KindSpec {
        name: "BaseModel",
        fields: &[],
    },
    KindSpec {
        name: "User",
        fields: &[
            FieldSpec { name: "email", ty: AttrType::Str },
            FieldSpec { name: "password", ty: AttrType::Str },
            FieldSpec { name: "first_name", ty: AttrType::Str },
            FieldSpec { name: "last_name", ty: AttrType::Str },
        ],
    },
    KindSpec {
        name: "State",
        fields: &[FieldSpec { name: "name", ty: AttrType::Str }],
    },
    KindSpec {
        name: "City",
        fields: &[
            FieldSpec { name: "state_id", ty: AttrType::Str },
            FieldSpec { name: "name", ty: AttrType::Str },
        ],
    },
    KindSpec {
        name: "Place",
        fields: &[
            FieldSpec { name: "city_id", ty: AttrType::Str },
            FieldSpec { name: "user_id", ty: AttrType::Str },
            FieldSpec { name: "name", ty: AttrType::Str },
            FieldSpec { name: "description", ty: AttrType::Str },
            FieldSpec { name: "number_rooms", ty: AttrType::Int },
            FieldSpec { name: "number_bathrooms", ty: AttrType::Int },
            FieldSpec { name: "max_guest", ty: AttrType::Int },
            FieldSpec { name: "price_by_night", ty: AttrType::Int },
            FieldSpec { name: "latitude", ty: AttrType::Float },
            FieldSpec { name: "longitude", ty: AttrType::Float },
            FieldSpec { name: "amenity_ids", ty: AttrType::StrList },
        ],
    },
    KindSpec {
        name: "Amenity",
        fields: &[FieldSpec { name: "name", ty: AttrType::Str }],
    },
    KindSpec {
        name: "Review",
        fields: &[
            FieldSpec { name: "place_id", ty: AttrType::Str },
            FieldSpec { name: "user_id", ty: AttrType::Str },
            FieldSpec { name: "text", ty: AttrType::Str },
        ],
    },
];

/// Lookup table from kind name to schema.
///
/// Populated once at startup; [`KindRegistry::resolve`] is the single
/// validation point for type names coming from user input or from the
/// persisted store.
pub struct KindRegistry {
    kinds: Vec<&'static KindSpec>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Registry pre-populated with every built-in kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in BUILTIN_KINDS {
            registry.register(spec);
        }
        registry
    }

    /// Register a kind. Kind names are case-sensitive and must be unique;
    /// registering the same name twice is a programming error.
    pub fn register(&mut self, spec: &'static KindSpec) {
        assert!(
            self.kinds.iter().all(|k| k.name != spec.name),
            "kind {:?} registered twice",
            spec.name
        );
        self.kinds.push(spec);
    }

    pub fn resolve(&self, name: &str) -> Result<&'static KindSpec, ModelError> {
        self.kinds
            .iter()
            .copied()
            .find(|k| k.name == name)
            .ok_or_else(|| ModelError::UnknownKind(name.to_string()))
    }

    /// All registered kind names, in registration order.
    pub fn known_kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.iter().map(|k| k.name)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
