//! Constant pool for compiled programs.
//!
//! The first three slots are reserved for the well-known literals:
//!
//! ```text
//! 0  null
//! 1  true
//! 2  false
//! ```
//!
//! Numbers are always deduplicated. Strings are only entered into the
//! deduplication index when shorter than the cache threshold, which bounds
//! the index's growth on scripts with large embedded text.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Slot of the `null` literal.
pub const NULL_SLOT: u32 = 0;
/// Slot of the `true` literal.
pub const TRUE_SLOT: u32 = 1;
/// Slot of the `false` literal.
pub const FALSE_SLOT: u32 = 2;

/// Default string cache threshold, in bytes.
pub const DEFAULT_CACHE_THRESHOLD: usize = 1024;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(String),
}

/// Hashable mirror of [`Constant`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int(i64),
    Real(OrderedFloat<f64>),
    String(String),
}

/// Program-wide constant pool with deduplication.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
    cache_threshold: usize,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_CACHE_THRESHOLD)
    }

    /// Create a pool that caches strings shorter than `cache_threshold` bytes.
    pub fn with_threshold(cache_threshold: usize) -> Self {
        Self {
            constants: vec![Constant::Null, Constant::Bool(true), Constant::Bool(false)],
            index: FxHashMap::default(),
            cache_threshold,
        }
    }

    pub fn cache_threshold(&self) -> usize {
        self.cache_threshold
    }

    fn push(&mut self, constant: Constant) -> u32 {
        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        idx
    }

    fn add_keyed(&mut self, key: ConstantKey, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.push(constant);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_int(&mut self, value: i64) -> u32 {
        self.add_keyed(ConstantKey::Int(value), Constant::Int(value))
    }

    pub fn add_real(&mut self, value: f64) -> u32 {
        self.add_keyed(ConstantKey::Real(OrderedFloat(value)), Constant::Real(value))
    }

    pub fn add_bool(&mut self, value: bool) -> u32 {
        if value { TRUE_SLOT } else { FALSE_SLOT }
    }

    /// Intern a string, reusing an existing slot when it is below the cache
    /// threshold.
    pub fn add_string(&mut self, value: &str) -> u32 {
        if value.len() < self.cache_threshold {
            self.add_keyed(ConstantKey::String(value.to_owned()), Constant::String(value.to_owned()))
        } else {
            self.push(Constant::String(value.to_owned()))
        }
    }

    /// Add a string without consulting the cache.
    pub fn add_string_uncached(&mut self, value: String) -> u32 {
        self.push(Constant::String(value))
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Always false: the reserved slots are present from the start.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}
