//! The interactive command interpreter.
//!
//! [`Console`] couples the kind registry and the file store behind a
//! single read-dispatch-respond loop: read one line, resolve it to a
//! command, run the verb against the table, report, repeat.
//! The loop is strictly sequential and ends only on `quit` or end of
//! input. Validation failures are short diagnostics; the session survives
//! all of them, and the in-memory table stays authoritative even when a
//! persist fails.

mod parser;

use std::io::{self, BufRead, Write};

use crate::models::{Entity, KindRegistry, KindSpec};
use crate::storage::FileStore;

use parser::Command;

pub const PROMPT: &str = "(hbnb) ";

/// Usage lines for `help`, in display order.
const HELP_TOPICS: &[(&str, &str)] = &[
    ("all", "all [<kind>] -- print every instance, optionally of one kind"),
    ("count", "count <kind> -- print the number of instances of a kind"),
    ("create", "create <kind> -- create an instance, persist it, print its id"),
    ("destroy", "destroy <kind> <id> -- delete an instance and persist"),
    ("help", "help [<command>] -- list commands or describe one"),
    ("quit", "quit -- exit the shell"),
    ("show", "show <kind> <id> -- print one instance"),
    ("update", "update <kind> <id> <attr> <value> -- set an attribute and persist"),
];

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    registry: KindRegistry,
    store: FileStore,
}

impl Console {
    pub fn new(registry: KindRegistry, store: FileStore) -> Self {
        Self { registry, store }
    }

    /// The read-dispatch-respond loop. Returns when `quit` is entered or
    /// input reaches end-of-file; both are normal termination.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> io::Result<()> {
        loop {
            out.write_all(PROMPT.as_bytes())?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            if self.dispatch(&line, &mut out)? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    fn dispatch<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        match parser::parse_line(line) {
            Command::Empty => {}
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(input) => writeln!(out, "*** Unknown syntax: {input}")?,
            Command::Help { topic } => self.do_help(topic.as_deref(), out)?,
            Command::Create { kind } => self.do_create(kind.as_deref(), out)?,
            Command::Show { kind, id } => self.do_show(kind.as_deref(), id.as_deref(), out)?,
            Command::Destroy { kind, id } => {
                self.do_destroy(kind.as_deref(), id.as_deref(), out)?
            }
            Command::All { kind } => self.do_all(kind.as_deref(), out)?,
            Command::Count { kind } => self.do_count(kind.as_deref(), out)?,
            Command::Update { kind, id, sets } => {
                self.do_update(kind.as_deref(), id.as_deref(), &sets, out)?
            }
        }
        Ok(Flow::Continue)
    }

    // ============================================================
    // Verb handlers
    // ============================================================

    fn do_create<W: Write>(&mut self, kind: Option<&str>, out: &mut W) -> io::Result<()> {
        let Some(spec) = self.resolve_kind(kind, out)? else {
            return Ok(());
        };
        let entity = Entity::new(spec);
        let id = entity.id().to_string();
        tracing::debug!(kind = spec.name, id = %id, "created entity");
        self.store.put(entity);
        self.save(out)?;
        writeln!(out, "{id}")
    }

    fn do_show<W: Write>(
        &self,
        kind: Option<&str>,
        id: Option<&str>,
        out: &mut W,
    ) -> io::Result<()> {
        let Some(spec) = self.resolve_kind(kind, out)? else {
            return Ok(());
        };
        let Some(id) = id else {
            return writeln!(out, "** instance id missing **");
        };
        match self.store.get(spec.name, id) {
            Some(entity) => writeln!(out, "{}", entity.describe()),
            None => writeln!(out, "** no instance found **"),
        }
    }

    fn do_destroy<W: Write>(
        &mut self,
        kind: Option<&str>,
        id: Option<&str>,
        out: &mut W,
    ) -> io::Result<()> {
        let Some(spec) = self.resolve_kind(kind, out)? else {
            return Ok(());
        };
        let Some(id) = id else {
            return writeln!(out, "** instance id missing **");
        };
        if !self.store.remove(spec.name, id) {
            return writeln!(out, "** no instance found **");
        }
        self.save(out)
    }

    fn do_all<W: Write>(&self, kind: Option<&str>, out: &mut W) -> io::Result<()> {
        match kind {
            Some(name) => {
                if self.registry.resolve(name).is_err() {
                    return writeln!(out, "** class doesn't exist **");
                }
                for entity in self.store.all(Some(name)) {
                    writeln!(out, "{}", entity.describe())?;
                }
            }
            // No filter: every kind, grouped in registration order.
            None => {
                for name in self.registry.known_kinds() {
                    for entity in self.store.all(Some(name)) {
                        writeln!(out, "{}", entity.describe())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn do_count<W: Write>(&self, kind: Option<&str>, out: &mut W) -> io::Result<()> {
        let Some(spec) = self.resolve_kind(kind, out)? else {
            return Ok(());
        };
        writeln!(out, "{}", self.store.count(Some(spec.name)))
    }

    fn do_update<W: Write>(
        &mut self,
        kind: Option<&str>,
        id: Option<&str>,
        sets: &[(String, Option<String>)],
        out: &mut W,
    ) -> io::Result<()> {
        let Some(spec) = self.resolve_kind(kind, out)? else {
            return Ok(());
        };
        let Some(id) = id else {
            return writeln!(out, "** instance id missing **");
        };
        if self.store.get(spec.name, id).is_none() {
            return writeln!(out, "** no instance found **");
        }
        let Some(first) = sets.first() else {
            return writeln!(out, "** attribute name missing **");
        };
        if first.1.is_none() {
            return writeln!(out, "** value missing **");
        }

        let Some(entity) = self.store.get_mut(spec.name, id) else {
            return Ok(());
        };
        let mut applied = 0usize;
        for (attr, value) in sets {
            let Some(value) = value.as_deref() else {
                continue;
            };
            if let Err(err) = entity.set_attr(attr, value) {
                writeln!(out, "** {err} **")?;
                break;
            }
            applied += 1;
        }
        if applied > 0 {
            entity.touch();
            self.save(out)?;
        }
        Ok(())
    }

    fn do_help<W: Write>(&self, topic: Option<&str>, out: &mut W) -> io::Result<()> {
        match topic {
            Some(name) => match HELP_TOPICS.iter().find(|(verb, _)| *verb == name) {
                Some((_, usage)) => writeln!(out, "{usage}"),
                None => writeln!(out, "*** No help on {name}"),
            },
            None => {
                writeln!(out, "Documented commands (type help <topic>):")?;
                writeln!(out, "========================================")?;
                let verbs: Vec<&str> = HELP_TOPICS.iter().map(|(verb, _)| *verb).collect();
                writeln!(out, "{}", verbs.join("  "))?;
                writeln!(out)?;
                let kinds: Vec<&str> = self.registry.known_kinds().collect();
                writeln!(out, "Known kinds: {}", kinds.join("  "))
            }
        }
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn resolve_kind<W: Write>(
        &self,
        kind: Option<&str>,
        out: &mut W,
    ) -> io::Result<Option<&'static KindSpec>> {
        match kind {
            None => {
                writeln!(out, "** class name missing **")?;
                Ok(None)
            }
            Some(name) => match self.registry.resolve(name) {
                Ok(spec) => Ok(Some(spec)),
                Err(_) => {
                    writeln!(out, "** class doesn't exist **")?;
                    Ok(None)
                }
            },
        }
    }

    /// Persist the table, reporting failure without ending the session:
    /// the in-memory table remains the source of truth until a later
    /// persist succeeds.
    fn save<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if let Err(err) = self.store.persist() {
            tracing::error!(error = %err, "persist failed");
            writeln!(out, "** save failed: {err} **")?;
        }
        Ok(())
    }
}
