//! CPLEX-LP export of the original problem.

use crate::cons::ConsKind;
use crate::engine::MipEngine;
use crate::error::MipError;
use crate::handle::VarHandle;
use crate::var::{Side, VarKind, VarType};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

impl<P> MipEngine<P> {
    /// Write the original problem as CPLEX-LP text.
    ///
    /// Custom constraints have no LP form and are listed as comments.
    pub fn write_lp<W: Write>(&self, out: &mut W) -> Result<(), MipError> {
        let header = self.problem.as_ref().ok_or(MipError::NoProblem)?;
        writeln!(out, "\\ Problem: {}", header.name)?;

        let mut columns = Vec::new();
        for &var in &header.vars {
            let record = self.var_record(var)?;
            let VarKind::Column(column) = &record.kind else {
                continue;
            };
            columns.push((var, record, column));
        }

        writeln!(out, "Minimize")?;
        let objective: Vec<(String, f64)> = columns
            .iter()
            .filter(|(_, _, column)| column.obj != 0.0)
            .map(|(var, record, column)| (lp_name(*var, &record.name), column.obj))
            .collect();
        writeln!(out, " obj: {}", fmt_objective(&objective))?;

        writeln!(out, "Subject To")?;
        for &cons in &header.conss {
            let record = self.cons_record(cons)?;
            let name = lp_name_cons(cons.inner(), &record.name);
            match &record.kind {
                ConsKind::Custom { handler } => {
                    writeln!(
                        out,
                        "\\ {name}: custom constraint of type '{}'",
                        self.conshdlr_name(*handler)?
                    )?;
                }
                ConsKind::Linear(row) => {
                    let (terms, constant) = self.lp_terms(&row.terms)?;
                    let lhs = row.lhs.map(|v| i128::from(v) - constant);
                    let rhs = row.rhs.map(|v| i128::from(v) - constant);
                    let expr = fmt_terms(&terms);
                    match (lhs, rhs) {
                        (Some(lo), Some(hi)) if lo == hi => writeln!(out, " {name}: {expr} = {lo}")?,
                        (Some(lo), Some(hi)) => {
                            writeln!(out, " {name}_lo: {expr} >= {lo}")?;
                            writeln!(out, " {name}_hi: {expr} <= {hi}")?;
                        }
                        (Some(lo), None) => writeln!(out, " {name}: {expr} >= {lo}")?,
                        (None, Some(hi)) => writeln!(out, " {name}: {expr} <= {hi}")?,
                        (None, None) => writeln!(out, "\\ {name}: free row")?,
                    }
                }
            }
        }

        writeln!(out, "Bounds")?;
        for (var, record, column) in &columns {
            let name = lp_name(*var, &record.name);
            let default_binary = record.var_type == VarType::Binary && (column.lb, column.ub) == (0, 1);
            if default_binary {
                continue;
            }
            if column.lb == column.ub {
                writeln!(out, " {name} = {}", column.lb)?;
            } else {
                writeln!(out, " {} <= {name} <= {}", column.lb, column.ub)?;
            }
        }

        let binaries: Vec<String> = columns
            .iter()
            .filter(|(_, record, _)| record.var_type == VarType::Binary)
            .map(|(var, record, _)| lp_name(*var, &record.name))
            .collect();
        if !binaries.is_empty() {
            writeln!(out, "Binaries")?;
            for name in &binaries {
                writeln!(out, " {name}")?;
            }
        }
        let generals: Vec<String> = columns
            .iter()
            .filter(|(_, record, _)| record.var_type == VarType::Integer)
            .map(|(var, record, _)| lp_name(*var, &record.name))
            .collect();
        if !generals.is_empty() {
            writeln!(out, "Generals")?;
            for name in &generals {
                writeln!(out, " {name}")?;
            }
        }
        writeln!(out, "End")?;
        Ok(())
    }

    /// Write the original problem to `path`.
    pub fn write_lp_file(&self, path: &Path) -> Result<(), MipError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_lp(&mut writer)?;
        writer.flush()?;
        debug!(
            component = "mip",
            operation = "write_lp",
            status = "success",
            path = %path.display(),
            "Wrote LP file"
        );
        Ok(())
    }

    /// Terms over columns with negation views folded into a constant.
    fn lp_terms(&self, terms: &[(VarHandle, i64)]) -> Result<(Vec<(String, i128)>, i128), MipError> {
        let mut merged: BTreeMap<VarHandle, i128> = BTreeMap::new();
        let mut constant: i128 = 0;
        for &(var, coeff) in terms {
            let (column, negated) = self.resolve_var(var)?;
            let coeff = i128::from(coeff);
            if negated {
                constant += coeff;
                *merged.entry(column).or_insert(0) -= coeff;
            } else {
                *merged.entry(column).or_insert(0) += coeff;
            }
        }
        let mut named = Vec::with_capacity(merged.len());
        for (column, coeff) in merged {
            if coeff == 0 {
                continue;
            }
            let record = self.var_record(column)?;
            if record.side != Side::Original {
                return Err(MipError::WrongSide(column));
            }
            named.push((lp_name(column, &record.name), coeff));
        }
        Ok((named, constant))
    }
}

/// LP-safe unique name: sanitized display name plus handle index.
fn lp_name(var: VarHandle, name: &str) -> String {
    format!("{}_{}", sanitize(name, 'x'), var.inner())
}

fn lp_name_cons(index: u32, name: &str) -> String {
    format!("{}_{}", sanitize(name, 'c'), index)
}

fn sanitize(name: &str, fallback: char) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !cleaned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        cleaned.insert(0, fallback);
    }
    cleaned
}

fn fmt_terms(terms: &[(String, i128)]) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    terms
        .iter()
        .map(|(name, coeff)| format!("{coeff:+} {name}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn fmt_objective(terms: &[(String, f64)]) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    terms
        .iter()
        .map(|(name, coeff)| format!("{} {name}", fmt_num(*coeff)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn fmt_num(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{:+}", value.round() as i64)
    } else {
        format!("{value:+.6}")
    }
}
