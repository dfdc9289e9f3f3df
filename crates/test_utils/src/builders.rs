//! Test Data Builders
//!
//! Provides builder patterns for constructing test entities with sensible
//! defaults. Tests set only the fields they care about.

use fake::faker::lorem::en::Word;
use fake::Fake;
use uuid::Uuid;

use crate::fixtures::Gadget;

/// Builder for constructing test gadgets
pub struct TestGadgetBuilder {
    id: String,
    category: String,
    name: String,
    x: i64,
    tags: Vec<String>,
}

impl Default for TestGadgetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestGadgetBuilder {
    /// Creates a new builder with a fresh id and a random name
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category: "tools".to_string(),
            name: Word().fake(),
            x: 0,
            tags: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_x(mut self, x: i64) -> Self {
        self.x = x;
        self
    }

    /// Adds a tag
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn build(self) -> Gadget {
        Gadget {
            id: self.id,
            category: self.category,
            name: self.name,
            x: self.x,
            tags: self.tags,
        }
    }
}

/// Builds `count` gadgets in `category`, with `x` cycling through `0..modulus`
pub fn gadget_batch(count: usize, category: &str, modulus: i64) -> Vec<Gadget> {
    (0..count)
        .map(|i| {
            TestGadgetBuilder::new()
                .with_id(format!("{}-{}", category, i))
                .with_category(category)
                .with_x(i as i64 % modulus.max(1))
                .build()
        })
        .collect()
}
