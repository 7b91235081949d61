//! Match printers: observers rendering one line per match.

use std::io::Write;

use itertools::Itertools;
use symon::automata::{Boolean, DataParametric};
use symon::constraints::StringEntry;
use symon::core::format_decimal;
use symon::monitor::{MatchRecord, ParametricMatch};
use symon::pipeline::Observer;

fn emit<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        tracing::error!("writing match output failed: {e}");
    }
}

/// Renders the entries tab-terminated, one field per bound-or-excluded slot.
fn symbolic_strings(entries: &[StringEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            StringEntry::Concrete(s) => format!("x{i} == {s}\t"),
            StringEntry::Excluded(set) => format!("x{i} != {{{}}}\t", set.iter().join(", ")),
        })
        .collect()
}

pub struct BooleanPrinter<W: Write> {
    out: W,
}

impl<W: Write> BooleanPrinter<W> {
    pub fn new(out: W) -> Self {
        BooleanPrinter { out }
    }
}

impl<W: Write> Observer<MatchRecord<Boolean>> for BooleanPrinter<W> {
    fn notify(&mut self, m: &MatchRecord<Boolean>) {
        let mut line = format!("@{}.\t(time-point {})\t", m.timestamp, m.index);
        for (i, slot) in m.strings.iter().enumerate() {
            if let Some(s) = slot {
                line.push_str(&format!("x{i} == {s}\t"));
            }
        }
        for (i, slot) in m.numbers.iter().enumerate() {
            if let Some(v) = slot {
                line.push_str(&format!("x{i} == {v}\t"));
            }
        }
        emit(&mut self.out, &line);
    }
}

pub struct DataParametricPrinter<W: Write> {
    out: W,
}

impl<W: Write> DataParametricPrinter<W> {
    pub fn new(out: W) -> Self {
        DataParametricPrinter { out }
    }
}

impl<W: Write> Observer<MatchRecord<DataParametric>> for DataParametricPrinter<W> {
    fn notify(&mut self, m: &MatchRecord<DataParametric>) {
        let line = format!(
            "@{}.\t(time-point {})\t{}{}",
            m.timestamp,
            m.index,
            symbolic_strings(&m.strings),
            m.numbers,
        );
        emit(&mut self.out, &line);
    }
}

pub struct ParametricPrinter<W: Write> {
    out: W,
}

impl<W: Write> ParametricPrinter<W> {
    pub fn new(out: W) -> Self {
        ParametricPrinter { out }
    }
}

impl<W: Write> Observer<ParametricMatch> for ParametricPrinter<W> {
    fn notify(&mut self, m: &ParametricMatch) {
        let line = format!(
            "@{}.\t(time-point {})\t{}Num: {}\tClock: {}",
            format_decimal(&m.timestamp),
            m.index,
            symbolic_strings(&m.strings),
            m.numbers,
            m.clocks,
        );
        emit(&mut self.out, &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symon::constraints::ConcreteNumbers;

    #[test]
    fn boolean_lines_show_bound_slots_only() {
        let mut printer = BooleanPrinter::new(Vec::new());
        printer.notify(&MatchRecord::<Boolean> {
            index: 3,
            timestamp: 15.5,
            numbers: ConcreteNumbers(vec![Some(200.0), None]),
            strings: vec![None, Some("y".into())],
        });
        let text = String::from_utf8(printer.out).unwrap();
        assert_eq!(text, "@15.5.\t(time-point 3)\tx1 == y\tx0 == 200\t\n");
    }

    #[test]
    fn boolean_line_without_bound_slots_keeps_the_field_separator() {
        let mut printer = BooleanPrinter::new(Vec::new());
        printer.notify(&MatchRecord::<Boolean> {
            index: 0,
            timestamp: 1.0,
            numbers: ConcreteNumbers(vec![None]),
            strings: vec![None],
        });
        let text = String::from_utf8(printer.out).unwrap();
        assert_eq!(text, "@1.\t(time-point 0)\t\n");
    }

    #[test]
    fn symbolic_string_rendering() {
        let rendered = symbolic_strings(&[
            StringEntry::Concrete("foo".into()),
            StringEntry::Excluded(vec!["a".into(), "b".into()]),
        ]);
        assert_eq!(rendered, "x0 == foo\tx1 != {a, b}\t");
        assert_eq!(symbolic_strings(&[]), "");
    }
}
