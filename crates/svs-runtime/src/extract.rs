//! [`ExtractCommand`] – evaluates a filter spec and mirrors its output.
//!
//! Results appear under the command root as
//!
//! ```text
//! (C ^result R)
//! (R ^record X1 ^record X2 …)
//! (X1 ^value 3.5 ^params P1)          scalar output
//! (X2 ^value V2 ^params P2)           struct/node output
//! (V2 ^x 1 ^y 0 ^z 2)
//! (P1 ^a A1 ^b 2)                     one attribute per row argument
//! ```
//!
//! Only deltas are written: a record is created for every added output,
//! dropped for every removed one, and its `^value` rewritten for every
//! changed one.  `^params` is rewritten when the row behind an output
//! changes, which the command learns by listening to the filter's input.
//!
//! The spec is fingerprinted every cycle and reparsed when it changes.
//! `extract_once` evaluates once per spec and then stops updating.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use svs_filter::{CtListListener, ElemId, Filter, FilterParams, SharedListener, Value};
use tracing::{debug, warn};

use crate::command::{Command, CommandContext, StatusSlot};
use crate::parse::{RESERVED_ATTRS, parse_filter_spec};
use crate::wm::{Identifier, Symbol, WmeId, WorkingMemory};

/// Status reported for specs that do not parse.
pub const SYNTAX_ERROR_STATUS: &str = "incorrect filter syntax";

/// Rows whose arguments changed since the last mirror pass.
#[derive(Debug, Default)]
struct RowChanges {
    rows: Vec<ElemId>,
}

impl CtListListener<FilterParams> for RowChanges {
    fn on_change(&mut self, id: ElemId, _value: &FilterParams) {
        if !self.rows.contains(&id) {
            self.rows.push(id);
        }
    }
}

/// Working-memory side of one output value.
#[derive(Debug)]
struct Record {
    /// `(R ^record X)`
    link: WmeId,
    id: Identifier,
    /// `(X ^value …)`
    value: WmeId,
    /// `(X ^params P)`
    params: Option<WmeId>,
    /// Input row the value came from.
    row: Option<ElemId>,
}

pub struct ExtractCommand {
    root: Identifier,
    once: bool,
    filter: Option<Filter>,
    fingerprint: Option<u64>,
    /// The mirrored records reflect the filter's latest successful update.
    evaluated: bool,
    result: Option<(WmeId, Identifier)>,
    records: HashMap<ElemId, Record>,
    changes: Rc<RefCell<RowChanges>>,
    status: StatusSlot,
}

impl ExtractCommand {
    pub fn new(root: Identifier, once: bool) -> Self {
        Self {
            root,
            once,
            filter: None,
            fingerprint: None,
            evaluated: false,
            result: None,
            records: HashMap::new(),
            changes: Rc::new(RefCell::new(RowChanges::default())),
            status: StatusSlot::default(),
        }
    }

    pub fn status(&self) -> &str {
        self.status.text()
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Reparse if the spec changed.  Returns whether it did.
    fn refresh_spec(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let fp = ctx.wm.fingerprint(self.root, &RESERVED_ATTRS);
        if self.fingerprint == Some(fp) {
            return false;
        }
        self.fingerprint = Some(fp);
        self.clear_records(ctx.wm);
        self.filter = None;
        self.evaluated = false;
        self.changes.borrow_mut().rows.clear();

        match parse_filter_spec(ctx.wm, &Symbol::Id(self.root), ctx.filters) {
            Ok(mut filter) => {
                let listener: SharedListener<FilterParams> = self.changes.clone();
                filter.listen_for_input(listener);
                debug!(root = %self.root, filter = filter.type_name(), "filter spec parsed");
                self.filter = Some(filter);
            }
            Err(e) => {
                warn!(root = %self.root, error = %e, "filter spec rejected");
                self.status.set(ctx.wm, self.root, SYNTAX_ERROR_STATUS);
            }
        }
        true
    }

    fn result_id(&mut self, wm: &mut WorkingMemory) -> Identifier {
        if let Some((_, id)) = self.result {
            return id;
        }
        let id = wm.make_id('R');
        let link = wm.add(self.root, "result", id);
        self.result = Some((link, id));
        id
    }

    fn clear_records(&mut self, wm: &mut WorkingMemory) {
        for (_, rec) in self.records.drain() {
            wm.remove(rec.link);
        }
    }

    fn mirror(&mut self, wm: &mut WorkingMemory) {
        let result = self.result_id(wm);
        let Some(filter) = self.filter.as_mut() else {
            return;
        };

        let out = filter.output();
        for (id, _) in out.removed() {
            if let Some(rec) = self.records.remove(&id) {
                wm.remove(rec.link);
            }
        }
        for (id, value) in out.changed() {
            if let Some(rec) = self.records.get_mut(&id) {
                if value.is_dirty() {
                    wm.remove(rec.value);
                    rec.value = write_value(wm, rec.id, "value", value.value());
                }
            }
        }
        for (id, value) in out.added() {
            let rec_id = wm.make_id('X');
            let link = wm.add(result, "record", rec_id);
            let value_wme = write_value(wm, rec_id, "value", value.value());
            let params = filter
                .output_params(id)
                .map(|p| write_params(wm, rec_id, p));
            self.records.insert(
                id,
                Record {
                    link,
                    id: rec_id,
                    value: value_wme,
                    params,
                    row: filter.output_origin(id),
                },
            );
        }

        let changed_rows = std::mem::take(&mut self.changes.borrow_mut().rows);
        if !changed_rows.is_empty() {
            for (out_id, rec) in &mut self.records {
                let Some(row) = rec.row else { continue };
                if !changed_rows.contains(&row) || out.is_added(*out_id) {
                    continue;
                }
                if let Some(p) = filter.output_params(*out_id) {
                    if let Some(old) = rec.params.take() {
                        wm.remove(old);
                    }
                    rec.params = Some(write_params(wm, rec.id, p));
                }
            }
        }

        let ids: Vec<ElemId> = out.current().map(|(id, _)| id).collect();
        let output = filter.output_mut();
        for id in ids {
            if let Some(v) = output.get_mut(id) {
                v.clear_dirty();
            }
        }
        output.clear_changes();
    }
}

impl Command for ExtractCommand {
    fn name(&self) -> &str {
        if self.once { "extract_once" } else { "extract" }
    }

    fn update(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let reparsed = self.refresh_spec(ctx);
        if self.filter.is_none() {
            return false;
        }
        if self.once && self.evaluated {
            return true;
        }
        if !reparsed && !ctx.dirty && self.evaluated {
            return true;
        }

        let Some(filter) = self.filter.as_mut() else {
            return false;
        };
        if let Err(e) = filter.update() {
            warn!(root = %self.root, error = %e, "filter evaluation failed");
            self.clear_records(ctx.wm);
            self.changes.borrow_mut().rows.clear();
            self.evaluated = false;
            self.status.set(ctx.wm, self.root, &e.to_string());
            return false;
        }

        self.mirror(ctx.wm);
        self.status.set(ctx.wm, self.root, "success");
        self.evaluated = true;
        true
    }
}

/// Write `(parent ^attr <value>)`, expanding composite values into a child
/// identifier with one attribute per sub-field.
fn write_value(wm: &mut WorkingMemory, parent: Identifier, attr: &str, value: &Value) -> WmeId {
    match value {
        Value::Int(i) => wm.add(parent, attr, *i),
        Value::Float(f) => wm.add(parent, attr, *f),
        Value::Bool(b) => wm.add(parent, attr, b.to_string()),
        Value::Str(s) => wm.add(parent, attr, s.as_str()),
        Value::Node(_) | Value::Struct(_) => {
            let child = wm.make_id('V');
            for (field, text) in value.rep() {
                wm.add(child, &field, Symbol::from_text(&text));
            }
            wm.add(parent, attr, child)
        }
    }
}

fn write_params(wm: &mut WorkingMemory, record: Identifier, params: &FilterParams) -> WmeId {
    let p = wm.make_id('P');
    for param in params.iter() {
        write_value(wm, p, &param.name, param.value.value());
    }
    wm.add(record, "params", p)
}

/// Record values currently mirrored under `root`, as text, in record order.
/// Composite values are rendered by their sub-fields.
pub fn mirrored_values(wm: &WorkingMemory, root: Identifier) -> Vec<String> {
    let Some(result) = wm.find(root, "result").and_then(Symbol::as_id) else {
        return Vec::new();
    };
    wm.children(result)
        .iter()
        .filter(|w| w.attr == "record")
        .filter_map(|w| w.value.as_id())
        .filter_map(|rec| wm.find(rec, "value"))
        .map(|v| match v {
            Symbol::Id(id) => wm
                .children(*id)
                .iter()
                .map(|c| format!("{}:{}", c.attr, c.value))
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        })
        .collect()
}
