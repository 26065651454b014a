//! Command context - the open session plus the short id index
//!
//! Every command opens one context, works through it and calls
//! [`CommandContext::finish`] so pending changes and new short ids are saved.

use miette::{miette, Result};
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::core::autosave::Session;
use crate::core::config::Config;
use crate::core::entity::{find, Entity};
use crate::core::identity::EntityId;
use crate::core::inventory::Inventory;
use crate::core::shortid::{is_short_id, ShortIdIndex};

pub struct CommandContext {
    session: Session,
    short_ids: ShortIdIndex,
    known_aliases: usize,
}

impl CommandContext {
    /// Load configuration, apply `--data-dir` and open the inventory
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let mut config = Config::try_load()?;
        if let Some(dir) = &global.data_dir {
            config.data_dir = Some(dir.clone());
        }
        let session = Session::open(&config)?;
        let short_ids = ShortIdIndex::load(session.store());
        let known_aliases = short_ids.len();
        Ok(Self {
            session,
            short_ids,
            known_aliases,
        })
    }

    pub fn read<R>(&self, f: impl FnOnce(&Inventory) -> R) -> R {
        self.session.read(f)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Inventory) -> R) -> R {
        self.session.write(f)
    }

    /// Read the inventory while assigning short ids
    pub fn with_aliases<R>(&mut self, f: impl FnOnce(&Inventory, &mut ShortIdIndex) -> R) -> R {
        let short_ids = &mut self.short_ids;
        self.session.read(|inv| f(inv, short_ids))
    }

    /// Short id for `id`, assigning one if needed
    pub fn alias(&mut self, id: EntityId) -> String {
        self.short_ids.add(id)
    }

    /// Short id if known, else the truncated full id
    pub fn display_id(&self, id: &EntityId) -> String {
        self.short_ids
            .alias_of(id)
            .map(str::to_string)
            .unwrap_or_else(|| crate::cli::helpers::format_short_id(id))
    }

    /// Resolve a full id, unique id fragment or short id among `items`
    pub fn resolve<T: Entity>(
        &self,
        reference: &str,
        items: fn(&Inventory) -> &[T],
    ) -> Result<EntityId> {
        let found = if is_short_id(reference) {
            self.short_ids
                .resolve(reference)
                .filter(|id| id.prefix() == T::PREFIX)
                .filter(|id| self.read(|inv| find(items(inv), id).is_some()))
        } else {
            self.read(|inv| Inventory::resolve_reference(items(inv), reference))
        };
        found.ok_or_else(|| {
            miette!(
                help = "Use a full id, a unique part of one, or a short id from a listing",
                "No {} record matches '{}'",
                T::PREFIX,
                reference
            )
        })
    }

    /// Save new short ids and close the session
    pub fn finish(self) -> Result<()> {
        if self.short_ids.len() != self.known_aliases {
            debug!(count = self.short_ids.len(), "saving short id index");
            self.short_ids.save(self.session.store())?;
        }
        self.session.close()?;
        Ok(())
    }
}
