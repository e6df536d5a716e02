//! Catalog model: gender → category → style.
//!
//! The catalog is a plain value. Every mutation goes through an
//! [`EditSession`](crate::edit::EditSession); this module only holds the types,
//! read-only queries, naming rules and shape validation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::image::ImageSource;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque, stable style identifier.
///
/// Generated ids carry a UUIDv7 so they sort by creation time, but any string
/// read back from storage is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleId(String);

impl StyleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a catalog style.
    pub fn generate() -> Self {
        Self(format!("{}{}", defaults::STYLE_ID_PREFIX, Uuid::now_v7()))
    }

    /// Fresh id for an ad-hoc custom style.
    pub fn generate_custom() -> Self {
        Self(format!("{}{}", defaults::CUSTOM_STYLE_ID_PREFIX, Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StyleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StyleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// A reference hairstyle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub id: StyleId,
    /// Positional display name, regenerated on every change to its category.
    pub name: String,
    pub image: ImageSource,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub styles: Vec<Style>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: Vec::new(),
        }
    }

    pub fn style(&self, id: &StyleId) -> Option<&Style> {
        self.styles.iter().find(|s| &s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gender {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Gender {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Where a style lives in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleMembership {
    pub gender: String,
    pub category: String,
}

/// The whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub genders: Vec<Gender>,
}

// =============================================================================
// NAMING
// =============================================================================

/// Positional display name: `"<gender> <category> <position>"` (1-based).
pub fn style_name(gender: &str, category: &str, position: usize) -> String {
    format!("{} {} {}", gender, category, position)
}

/// Prompt given to a new style when the caller supplies none.
pub fn default_prompt(name: &str, category: &str) -> String {
    format!("{} hairstyle, {} style", name, category)
}

/// Rewrite every style name in a category to its position.
pub(crate) fn renumber(gender: &str, category: &mut Category) {
    for (i, style) in category.styles.iter_mut().enumerate() {
        style.name = style_name(gender, &category.name, i + 1);
    }
}

/// Normalize a user-supplied gender or category label.
pub(crate) fn normalize_label(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} name must not be blank", kind)));
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// QUERIES
// =============================================================================

impl Catalog {
    /// An empty catalog (no genders at all).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in catalog used when nothing valid is persisted.
    pub fn builtin() -> Self {
        let genders = defaults::DEFAULT_GENDERS
            .iter()
            .map(|g| Gender {
                name: (*g).to_string(),
                categories: defaults::DEFAULT_CATEGORIES
                    .iter()
                    .map(|c| Category::new(*c))
                    .collect(),
            })
            .collect();
        Self { genders }
    }

    pub fn genders(&self) -> &[Gender] {
        &self.genders
    }

    pub fn gender_names(&self) -> impl Iterator<Item = &str> {
        self.genders.iter().map(|g| g.name.as_str())
    }

    pub fn gender(&self, name: &str) -> Option<&Gender> {
        self.genders.iter().find(|g| g.name == name)
    }

    pub fn categories(&self, gender: &str) -> Result<&[Category]> {
        self.gender(gender)
            .map(|g| g.categories.as_slice())
            .ok_or_else(|| Error::NotFound(format!("gender '{}'", gender)))
    }

    pub fn category(&self, gender: &str, category: &str) -> Result<&Category> {
        self.gender(gender)
            .ok_or_else(|| Error::NotFound(format!("gender '{}'", gender)))?
            .category(category)
            .ok_or_else(|| {
                Error::NotFound(format!("category '{}' under gender '{}'", category, gender))
            })
    }

    pub fn styles(&self, gender: &str, category: &str) -> Result<&[Style]> {
        self.category(gender, category).map(|c| c.styles.as_slice())
    }

    /// Look a style up by id anywhere in the catalog.
    pub fn find_style(&self, id: &StyleId) -> Option<(&Style, StyleMembership)> {
        self.genders.iter().find_map(|g| {
            g.categories.iter().find_map(|c| {
                c.style(id).map(|s| {
                    (
                        s,
                        StyleMembership {
                            gender: g.name.clone(),
                            category: c.name.clone(),
                        },
                    )
                })
            })
        })
    }

    pub fn style_count(&self) -> usize {
        self.genders
            .iter()
            .flat_map(|g| g.categories.iter())
            .map(|c| c.styles.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.genders.is_empty()
    }

    /// Check structural invariants: non-blank unique labels at each level and
    /// globally unique style ids.
    pub fn validate(&self) -> Result<()> {
        let mut gender_names = HashSet::new();
        let mut style_ids = HashSet::new();

        for gender in &self.genders {
            if gender.name.trim().is_empty() {
                return Err(Error::InvalidInput("gender name is blank".to_string()));
            }
            if !gender_names.insert(gender.name.as_str()) {
                return Err(Error::DuplicateKey(format!("gender '{}'", gender.name)));
            }

            let mut category_names = HashSet::new();
            for category in &gender.categories {
                if category.name.trim().is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "blank category name under gender '{}'",
                        gender.name
                    )));
                }
                if !category_names.insert(category.name.as_str()) {
                    return Err(Error::DuplicateKey(format!(
                        "category '{}' under gender '{}'",
                        category.name, gender.name
                    )));
                }
                for style in &category.styles {
                    if style.id.as_str().is_empty() {
                        return Err(Error::InvalidInput("style id is blank".to_string()));
                    }
                    if !style_ids.insert(&style.id) {
                        return Err(Error::DuplicateKey(format!("style id '{}'", style.id)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Regenerate every positional style name.
    pub fn renumber_all(&mut self) {
        for gender in &mut self.genders {
            let gender_name = gender.name.clone();
            for category in &mut gender.categories {
                renumber(&gender_name, category);
            }
        }
    }
}

// =============================================================================
// PERSISTED LAYOUTS
// =============================================================================

/// A stored image reference. An unreadable value is kept as its parse error so
/// the owning style can be dropped without failing the whole catalog.
#[derive(Debug)]
struct StoredImage(std::result::Result<ImageSource, String>);

impl<'de> Deserialize<'de> for StoredImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StoredImage(ImageSource::parse(&raw).map_err(|e| e.to_string())))
    }
}

impl StoredImage {
    /// The image, or `None` after logging why the style is skipped.
    fn into_source(self, gender: &str, category: &str, id: Option<&str>) -> Option<ImageSource> {
        match self.0 {
            Ok(source) => Some(source),
            Err(error) => {
                warn!(
                    subsystem = "catalog",
                    op = "load",
                    gender = %gender,
                    category = %category,
                    style_id = id.unwrap_or("-"),
                    error = %error,
                    "Dropping stored style with unreadable image"
                );
                None
            }
        }
    }
}

/// Current nested layout as stored; mirrors [`Catalog`].
#[derive(Debug, Deserialize)]
pub(crate) struct NestedCatalog {
    genders: Vec<NestedGender>,
}

#[derive(Debug, Deserialize)]
struct NestedGender {
    name: String,
    #[serde(default)]
    categories: Vec<NestedCategory>,
}

#[derive(Debug, Deserialize)]
struct NestedCategory {
    name: String,
    #[serde(default)]
    styles: Vec<NestedStyle>,
}

#[derive(Debug, Deserialize)]
struct NestedStyle {
    id: StyleId,
    name: String,
    image: StoredImage,
    prompt: String,
}

impl NestedCatalog {
    pub(crate) fn into_catalog(self) -> Catalog {
        let genders = self
            .genders
            .into_iter()
            .map(|gender| {
                let categories = gender
                    .categories
                    .into_iter()
                    .map(|category| {
                        let styles = category
                            .styles
                            .into_iter()
                            .filter_map(|s| {
                                let image = s.image.into_source(
                                    &gender.name,
                                    &category.name,
                                    Some(s.id.as_str()),
                                )?;
                                Some(Style {
                                    id: s.id,
                                    name: s.name,
                                    image,
                                    prompt: s.prompt,
                                })
                            })
                            .collect();
                        Category {
                            name: category.name,
                            styles,
                        }
                    })
                    .collect();
                Gender {
                    name: gender.name,
                    categories,
                }
            })
            .collect();
        Catalog { genders }
    }
}

/// Flat layout written by the earlier browser front-end:
/// `{genders: [..], categories: {gender: [..]}, styles: {"gender-category": [..]}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct LegacyCatalog {
    genders: Vec<String>,
    categories: BTreeMap<String, Vec<String>>,
    styles: BTreeMap<String, Vec<LegacyStyle>>,
}

#[derive(Debug, Deserialize)]
struct LegacyStyle {
    id: Option<String>,
    image: StoredImage,
    prompt: Option<String>,
}

impl LegacyCatalog {
    pub(crate) fn into_catalog(mut self) -> Catalog {
        let mut catalog = Catalog::empty();
        for gender_name in self.genders {
            let mut gender = Gender::new(gender_name.clone());
            let category_names = self.categories.remove(&gender_name).unwrap_or_default();
            for category_name in category_names {
                let key = format!("{}-{}", gender_name, category_name);
                let styles = self
                    .styles
                    .remove(&key)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|s| {
                        let image =
                            s.image
                                .into_source(&gender_name, &category_name, s.id.as_deref())?;
                        Some((s.id, image, s.prompt))
                    })
                    .enumerate()
                    .map(|(i, (id, image, prompt))| {
                        let name = style_name(&gender_name, &category_name, i + 1);
                        Style {
                            id: id.map(StyleId::new).unwrap_or_else(StyleId::generate),
                            prompt: prompt
                                .unwrap_or_else(|| default_prompt(&name, &category_name)),
                            name,
                            image,
                        }
                    })
                    .collect();
                gender.categories.push(Category {
                    name: category_name,
                    styles,
                });
            }
            catalog.genders.push(gender);
        }
        catalog
    }
}

/// Either persisted layout. The nested layout is tried first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredCatalog {
    Nested(NestedCatalog),
    Legacy(LegacyCatalog),
}

impl StoredCatalog {
    pub(crate) fn into_catalog(self) -> Catalog {
        match self {
            StoredCatalog::Nested(nested) => nested.into_catalog(),
            StoredCatalog::Legacy(legacy) => legacy.into_catalog(),
        }
    }
}

/// Parse persisted JSON into a validated catalog with normalized names.
pub fn parse_catalog(json: &str) -> Result<Catalog> {
    let stored: StoredCatalog = serde_json::from_str(json)?;
    let mut catalog = stored.into_catalog();
    catalog.validate()?;
    catalog.renumber_all();
    Ok(catalog)
}
