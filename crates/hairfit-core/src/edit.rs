//! Copy-edit-commit sessions over the catalog.
//!
//! A session owns a deep copy of the catalog. Every operation either applies
//! completely or returns an error having changed nothing. Dropping a session
//! without committing discards its edits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{
    default_prompt, normalize_label, renumber, style_name, Catalog, Category, Gender, Style,
    StyleId,
};
use crate::error::{Error, Result};
use crate::image::ImageSource;

/// Marks a store's single edit slot as taken; frees it on drop.
#[derive(Debug)]
pub(crate) struct EditGuard {
    flag: Arc<AtomicBool>,
}

impl EditGuard {
    /// Claim the slot, or `None` if another session holds it.
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for EditGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A private, mutable copy of the catalog.
#[derive(Debug)]
pub struct EditSession {
    catalog: Catalog,
    guard: Option<EditGuard>,
}

impl EditSession {
    /// Start a detached session over a deep copy of `catalog`.
    pub fn begin(catalog: &Catalog) -> Self {
        Self {
            catalog: catalog.clone(),
            guard: None,
        }
    }

    pub(crate) fn with_guard(catalog: &Catalog, guard: EditGuard) -> Self {
        Self {
            catalog: catalog.clone(),
            guard: Some(guard),
        }
    }

    pub(crate) fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    pub(crate) fn into_parts(self) -> (Catalog, Option<EditGuard>) {
        (self.catalog, self.guard)
    }

    /// The working copy as edited so far.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Finish the session and hand back the edited catalog.
    pub fn commit(self) -> Catalog {
        self.catalog
    }

    pub fn add_gender(&mut self, name: &str) -> Result<()> {
        let name = normalize_label("gender", name)?;
        if self.catalog.gender(&name).is_some() {
            return Err(Error::DuplicateKey(format!("gender '{}'", name)));
        }
        debug!(
            subsystem = "catalog",
            component = "edit_session",
            op = "add_gender",
            gender = %name,
            "Adding gender"
        );
        self.catalog.genders.push(Gender::new(name));
        Ok(())
    }

    /// Remove a gender together with all of its categories and styles.
    pub fn remove_gender(&mut self, name: &str) -> Result<Gender> {
        let index = self
            .catalog
            .genders
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| Error::NotFound(format!("gender '{}'", name)))?;
        let removed = self.catalog.genders.remove(index);
        debug!(
            subsystem = "catalog",
            component = "edit_session",
            op = "remove_gender",
            gender = %name,
            style_count = removed.categories.iter().map(|c| c.styles.len()).sum::<usize>(),
            "Removed gender"
        );
        Ok(removed)
    }

    pub fn add_category(&mut self, gender: &str, name: &str) -> Result<()> {
        let name = normalize_label("category", name)?;
        let g = self.gender_mut(gender)?;
        if g.category(&name).is_some() {
            return Err(Error::DuplicateKey(format!(
                "category '{}' under gender '{}'",
                name, gender
            )));
        }
        debug!(
            subsystem = "catalog",
            component = "edit_session",
            op = "add_category",
            gender = %gender,
            category = %name,
            "Adding category"
        );
        g.categories.push(Category::new(name));
        Ok(())
    }

    /// Remove a category together with its styles.
    pub fn remove_category(&mut self, gender: &str, name: &str) -> Result<Category> {
        let g = self.gender_mut(gender)?;
        let index = g
            .categories
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                Error::NotFound(format!("category '{}' under gender '{}'", name, gender))
            })?;
        let removed = g.categories.remove(index);
        debug!(
            subsystem = "catalog",
            component = "edit_session",
            op = "remove_category",
            gender = %gender,
            category = %name,
            style_count = removed.styles.len(),
            "Removed category"
        );
        Ok(removed)
    }

    /// Append a style with a fresh id and the next positional name.
    ///
    /// A blank or missing prompt falls back to [`default_prompt`].
    pub fn add_style(
        &mut self,
        gender: &str,
        category: &str,
        image: ImageSource,
        prompt: Option<String>,
    ) -> Result<Style> {
        let c = self.category_mut(gender, category)?;
        let name = style_name(gender, category, c.styles.len() + 1);
        let prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| default_prompt(&name, category));
        let style = Style {
            id: StyleId::generate(),
            name,
            image,
            prompt,
        };
        debug!(
            subsystem = "catalog",
            component = "edit_session",
            op = "add_style",
            gender = %gender,
            category = %category,
            style_id = %style.id,
            "Adding style"
        );
        c.styles.push(style.clone());
        Ok(style)
    }

    /// Remove a style by id and renumber the rest of its category.
    pub fn remove_style(&mut self, gender: &str, category: &str, id: &StyleId) -> Result<Style> {
        let c = self.category_mut(gender, category)?;
        let index = position_of(c, id)?;
        let removed = c.styles.remove(index);
        renumber(gender, c);
        debug!(
            subsystem = "catalog",
            component = "edit_session",
            op = "remove_style",
            gender = %gender,
            category = %category,
            style_id = %id,
            style_count = c.styles.len(),
            "Removed style"
        );
        Ok(removed)
    }

    /// Move a style to `index` within its category and renumber.
    pub fn move_style(
        &mut self,
        gender: &str,
        category: &str,
        id: &StyleId,
        index: usize,
    ) -> Result<()> {
        let c = self.category_mut(gender, category)?;
        let from = position_of(c, id)?;
        if index >= c.styles.len() {
            return Err(Error::InvalidInput(format!(
                "position {} is out of range for {} styles",
                index,
                c.styles.len()
            )));
        }
        let style = c.styles.remove(from);
        c.styles.insert(index, style);
        renumber(gender, c);
        Ok(())
    }

    pub fn set_style_prompt(
        &mut self,
        gender: &str,
        category: &str,
        id: &StyleId,
        prompt: &str,
    ) -> Result<()> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::InvalidInput("prompt must not be blank".to_string()));
        }
        let c = self.category_mut(gender, category)?;
        let index = position_of(c, id)?;
        c.styles[index].prompt = prompt.to_string();
        Ok(())
    }

    fn gender_mut(&mut self, name: &str) -> Result<&mut Gender> {
        self.catalog
            .genders
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| Error::NotFound(format!("gender '{}'", name)))
    }

    fn category_mut(&mut self, gender: &str, category: &str) -> Result<&mut Category> {
        self.gender_mut(gender)?
            .categories
            .iter_mut()
            .find(|c| c.name == category)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "category '{}' under gender '{}'",
                    category, gender
                ))
            })
    }
}

fn position_of(category: &Category, id: &StyleId) -> Result<usize> {
    category
        .styles
        .iter()
        .position(|s| &s.id == id)
        .ok_or_else(|| Error::NotFound(format!("style '{}'", id)))
}
