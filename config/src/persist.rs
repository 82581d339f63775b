//! Writing settings back to disk.
//!
//! Uses `toml_edit` so comments, ordering and keys we do not own survive a
//! round trip.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use toml_edit::{Array, DocumentMut, Item, Table, value};

use crate::{ConfigError, Settings, config_path};

fn table<'a>(doc: &'a mut DocumentMut, name: &str) -> Result<&'a mut Table, ConfigError> {
    doc.entry(name)
        .or_insert(Item::Table(Table::new()))
        .as_table_mut()
        .ok_or_else(|| ConfigError::NotATable(name.to_string()))
}

impl Settings {
    /// Merge these settings into an existing TOML document.
    ///
    /// Fails if a section key holds a non-table value.
    pub fn write_into(&self, doc: &mut DocumentMut) -> Result<(), ConfigError> {
        let session = table(doc, "session")?;
        if let Some(target) = &self.session.target {
            session["target"] = value(target.as_str());
        }
        if let Some(file) = &self.session.presence_file {
            session["presence_file"] = value(file.display().to_string());
        }
        let mut active = Array::new();
        for label in self.session.active_states.labels() {
            active.push(label.as_str());
        }
        session["active_states"] = value(active);

        let clock = table(doc, "clock")?;
        clock["cycle_bits"] = value(i64::from(self.clock.cycle_bits));
        clock["drift_range"] = value(self.clock.drift_range);
        clock["reset_probability"] = value(self.clock.reset_probability);
        clock["randomize_table"] = value(self.clock.randomize_table);
        clock["keepalive_seconds"] = value(self.clock.keepalive.as_secs_f64());

        let presence = table(doc, "presence")?;
        presence["poll_interval"] = value(self.presence.poll_interval.as_secs_f64());
        presence["offline_grace"] = value(self.presence.offline_grace.as_secs_f64());

        let actions = table(doc, "actions")?;
        actions["period"] = value(self.actions.period.as_secs_f64());
        actions["pointer_step"] = value(i64::from(self.actions.pointer_step));
        actions["pointer_accel"] = value(i64::from(self.actions.pointer_accel));
        actions["pointer_max_step"] = value(i64::from(self.actions.pointer_max_step));
        actions["key_delay"] = value(self.actions.key_delay.as_secs_f64());
        actions["adminless_keys"] = value(self.actions.adminless_keys);
        actions["pointer_dominance"] = value(i64::from(self.actions.dominance.pointer()));
        actions["key_dominance"] = value(i64::from(self.actions.dominance.key()));
        Ok(())
    }

    /// Persist to the default config path, returning where it was written.
    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoPath)?;
        self.persist_to(&path)?;
        Ok(path)
    }

    /// Persist to `path`, creating parent directories as needed.
    ///
    /// The file is replaced atomically (temp file + rename).
    pub fn persist_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_err)?;

        let content = if path.exists() {
            fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };

        let mut doc = content.parse::<DocumentMut>().map_err(|e| {
            write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        self.write_into(&mut doc)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(doc.to_string().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        tracing::info!(path = %path.display(), "Settings persisted");
        Ok(())
    }
}
