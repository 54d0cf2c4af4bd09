//! Keyed cache of shared text models and the views holding them.
//!
//! The registry guarantees at most one live [`TextModel`] per
//! [`DocumentId`]. Every model it hands out has an entry, untitled ones
//! included, so a holder can always be detached by identity.

use crate::language::Language;
use crate::model::{DocumentId, TextModel};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of a model holder (a view).
pub type HolderId = u64;

/// Capability implemented by anything that displays a model.
pub trait ModelHolder {
    fn holder_id(&self) -> HolderId;

    /// Points the holder at `model`. Called for every holder before the
    /// previous model is disposed.
    fn replace_model(&self, model: Rc<TextModel>);

    /// Called once every holder has been moved and the previous model is gone.
    /// `baseline` is the content now stored under the new identity.
    fn did_rekey(&self, previous: &DocumentId, baseline: &str);

    /// Called when another holder wrote the model's content to disk.
    fn did_save(&self, _baseline: &str) {}

    /// Called when another holder is about to replace the shared content
    /// with `baseline`, freshly read from disk. Unmodified holders adopt it
    /// as their baseline without notifying.
    fn will_reload(&self, _baseline: &str) {}
}

struct Holder {
    id: HolderId,
    holder: Weak<dyn ModelHolder>,
}

struct Entry {
    model: Rc<TextModel>,
    holders: Vec<Holder>,
}

impl Entry {
    fn new(model: Rc<TextModel>) -> Self {
        Self {
            model,
            holders: Vec::new(),
        }
    }

    fn has_holder(&self, id: HolderId) -> bool {
        self.holders.iter().any(|h| h.id == id)
    }
}

/// The model cache.
pub struct ModelRegistry {
    entries: RefCell<HashMap<DocumentId, Entry>>,
    next_untitled: Cell<u64>,
    next_holder: Cell<HolderId>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.entries.borrow().len())
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            next_untitled: Cell::new(1),
            next_holder: Cell::new(1),
        }
    }

    /// Issues a fresh identity for an unsaved buffer.
    pub fn untitled_id(&self) -> DocumentId {
        let token = self.next_untitled.get();
        self.next_untitled.set(token + 1);
        DocumentId::Untitled(token)
    }

    /// Issues an id for a new holder.
    pub fn next_holder_id(&self) -> HolderId {
        let id = self.next_holder.get();
        self.next_holder.set(id + 1);
        id
    }

    /// Returns the model for `identity`, creating it from `initial_text` if
    /// none exists yet.
    pub fn get(&self, identity: DocumentId, initial_text: &str) -> Rc<TextModel> {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.get(&identity) {
            return Rc::clone(&entry.model);
        }

        let language = identity.path().map(Language::from_path).unwrap_or_default();
        log::debug!("creating model {} ({})", identity, language.id());
        let model = Rc::new(TextModel::new(identity.clone(), initial_text, language));
        entries.insert(identity, Entry::new(Rc::clone(&model)));
        model
    }

    /// Returns the live model for `identity` without creating one.
    pub fn model(&self, identity: &DocumentId) -> Option<Rc<TextModel>> {
        self.entries
            .borrow()
            .get(identity)
            .map(|entry| Rc::clone(&entry.model))
    }

    /// Registers `holder` as displaying `model`.
    ///
    /// Returns `false` when `model` is not the registered model for its
    /// identity (disposed or foreign).
    pub fn attach(&self, model: &Rc<TextModel>, holder: &Rc<dyn ModelHolder>) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries
            .get_mut(model.identity())
            .filter(|entry| Rc::ptr_eq(&entry.model, model))
        else {
            log::warn!("refusing to attach to unregistered model {}", model.identity());
            return false;
        };

        let id = holder.holder_id();
        if !entry.has_holder(id) {
            entry.holders.push(Holder {
                id,
                holder: Rc::downgrade(holder),
            });
            log::trace!("holder {} attached to {} ({} total)", id, model.identity(), entry.holders.len());
        }
        true
    }

    /// Removes a holder. The model is disposed when its last holder leaves.
    ///
    /// Detaching an unknown model or holder is a no-op that returns `false`.
    pub fn detach(&self, model: &Rc<TextModel>, holder: HolderId) -> bool {
        let released = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries
                .get_mut(model.identity())
                .filter(|entry| Rc::ptr_eq(&entry.model, model))
            else {
                log::warn!("detach from unregistered model {}", model.identity());
                return false;
            };
            if !entry.has_holder(holder) {
                log::warn!("holder {} is not attached to {}", holder, model.identity());
                return false;
            }

            entry.holders.retain(|h| h.id != holder);
            if entry.holders.is_empty() {
                entries.remove(model.identity()).map(|entry| entry.model)
            } else {
                None
            }
        };

        if let Some(model) = released {
            model.dispose();
        }
        true
    }

    /// Moves every holder of `model` to a model stored under `identity`.
    ///
    /// The new model carries the current content of `model`; an existing
    /// model at `identity` is reused and overwritten, and its own holders get
    /// [`ModelHolder::did_save`]. `baseline` is the text written to the new
    /// location and is forwarded to the holders. Undo history does not survive.
    pub fn rekey(&self, model: &Rc<TextModel>, identity: DocumentId, baseline: &str) -> Rc<TextModel> {
        if model.identity() == &identity {
            return Rc::clone(model);
        }

        let text = model.text();
        let language = match identity.path().map(Language::from_path) {
            Some(detected) if detected != Language::PlainText => detected,
            _ => model.language(),
        };

        let (target, moved, resident, reused) = {
            let mut entries = self.entries.borrow_mut();
            let registered = entries
                .get(model.identity())
                .is_some_and(|entry| Rc::ptr_eq(&entry.model, model));
            let moved = if registered {
                entries
                    .remove(model.identity())
                    .map(|entry| entry.holders)
                    .unwrap_or_default()
            } else {
                log::warn!("rekey of unregistered model {}", model.identity());
                Vec::new()
            };

            let reused = entries.contains_key(&identity);
            let resident: Vec<Weak<dyn ModelHolder>> = entries
                .get(&identity)
                .map(|entry| entry.holders.iter().map(|h| Weak::clone(&h.holder)).collect())
                .unwrap_or_default();
            let entry = entries.entry(identity.clone()).or_insert_with(|| {
                Entry::new(Rc::new(TextModel::new(identity.clone(), &text, language)))
            });
            let target = Rc::clone(&entry.model);
            for holder in &moved {
                if !entry.has_holder(holder.id) {
                    entry.holders.push(Holder {
                        id: holder.id,
                        holder: Weak::clone(&holder.holder),
                    });
                }
            }
            (target, moved, resident, reused)
        };

        log::debug!(
            "rekeyed {} -> {} ({} holders{})",
            model.identity(),
            identity,
            moved.len(),
            if reused { ", reused target" } else { "" }
        );

        if reused {
            target.set_text(&text);
        }

        let live: Vec<Rc<dyn ModelHolder>> = moved.iter().filter_map(|h| h.holder.upgrade()).collect();
        for holder in &live {
            holder.replace_model(Rc::clone(&target));
        }
        model.dispose();
        for holder in &live {
            holder.did_rekey(model.identity(), baseline);
        }
        for holder in resident.iter().filter_map(Weak::upgrade) {
            holder.did_save(baseline);
        }
        target
    }

    /// Live holders of `model`, in attach order.
    pub fn holders(&self, model: &TextModel) -> Vec<Rc<dyn ModelHolder>> {
        self.entries
            .borrow()
            .get(model.identity())
            .filter(|entry| std::ptr::eq(Rc::as_ptr(&entry.model), model))
            .map(|entry| entry.holders.iter().filter_map(|h| h.holder.upgrade()).collect())
            .unwrap_or_default()
    }

    /// Returns true when more than one holder displays `model`.
    pub fn is_shared(&self, model: &TextModel) -> bool {
        self.holder_count(model) > 1
    }

    /// Number of holders attached to `model`.
    pub fn holder_count(&self, model: &TextModel) -> usize {
        self.entries
            .borrow()
            .get(model.identity())
            .filter(|entry| std::ptr::eq(Rc::as_ptr(&entry.model), model))
            .map(|entry| entry.holders.len())
            .unwrap_or(0)
    }

    /// Returns true when a model is registered under `identity`.
    pub fn contains(&self, identity: &DocumentId) -> bool {
        self.entries.borrow().contains_key(identity)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
