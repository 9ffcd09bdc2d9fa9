//! Final compilation phase: structural validation of the expanded
//! instruction stream and emission of the finished program text.
//!
//! The validator is line-based: comments are stripped, the `!!ARBfp1.0`
//! header must come first, every statement's opcode must be in the ARB
//! fragment program instruction set, and exactly one `END` must terminate
//! the program. `KIL` is an ordinary instruction here; its position relative
//! to surrounding instructions is preserved exactly as written.

use super::error::{CallChain, CompileError};
use super::symbols::{ResourceKind, SymbolTable};

/// Validate `text` (the expanded source of `template`) and return the
/// normalized program text. Temp declarations are counted into `symbols`.
pub(crate) fn assemble(
    template: &str,
    text: &str,
    symbols: &mut SymbolTable,
) -> Result<String, CompileError> {
    let chain = CallChain::single(template);
    let mut saw_header = false;
    let mut ended = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let code = strip_comment(raw).trim();
        if code.contains("{{") || code.contains("{%") {
            return Err(CompileError::Syntax {
                template: template.to_string(),
                line,
                message: "unresolved template directive in assembled program".to_string(),
            });
        }
        if code.is_empty() {
            continue;
        }
        if !saw_header {
            if code == "!!ARBfp1.0" {
                saw_header = true;
                continue;
            }
            return Err(CompileError::Syntax {
                template: template.to_string(),
                line,
                message: format!("expected !!ARBfp1.0 header, found `{code}`"),
            });
        }
        for statement in code.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if ended {
                return Err(CompileError::TrailingCodeAfterEnd {
                    template: template.to_string(),
                    line,
                });
            }
            if statement == "END" {
                ended = true;
                continue;
            }
            validate_statement(template, statement, line, symbols, &chain)?;
        }
    }

    if !saw_header {
        return Err(CompileError::Syntax {
            template: template.to_string(),
            line: 1,
            message: "empty program: missing !!ARBfp1.0 header".to_string(),
        });
    }
    if !ended {
        return Err(CompileError::MissingEnd {
            template: template.to_string(),
        });
    }
    Ok(normalize(text))
}

fn validate_statement(
    template: &str,
    statement: &str,
    line: usize,
    symbols: &mut SymbolTable,
    chain: &CallChain,
) -> Result<(), CompileError> {
    let (head, rest) = match statement.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (statement, ""),
    };

    match head {
        "TEMP" => {
            for name in rest.split(',').map(str::trim) {
                if !super::parse::is_ident(name) {
                    return Err(CompileError::Syntax {
                        template: template.to_string(),
                        line,
                        message: format!("`{name}` is not a valid TEMP name"),
                    });
                }
                // Drivers reject redeclaration of a temporary.
                if symbols.slot_of(ResourceKind::Temp, name).is_some() {
                    return Err(CompileError::Syntax {
                        template: template.to_string(),
                        line,
                        message: format!("duplicate TEMP declaration `{name}`"),
                    });
                }
                symbols.resolve(ResourceKind::Temp, name, None, chain)?;
            }
            return Ok(());
        }
        // Named aliases; our generated programs address resources directly,
        // but hand-written templates may declare these.
        "PARAM" | "ATTRIB" | "OUTPUT" => return Ok(()),
        _ => {}
    }

    let opcode = head.strip_suffix("_SAT").unwrap_or(head);
    let Some(arity) = opcode_arity(opcode) else {
        return Err(CompileError::UnknownInstruction {
            template: template.to_string(),
            opcode: head.to_string(),
            line,
        });
    };
    if let Some(expected) = arity {
        let found = count_operands(rest);
        if found != expected {
            return Err(CompileError::Syntax {
                template: template.to_string(),
                line,
                message: format!("`{opcode}` expects {expected} operands, found {found}"),
            });
        }
    }
    if statement.contains("result.color") {
        symbols.resolve(ResourceKind::Result, "color", None, chain)?;
    }
    Ok(())
}

/// Operand count for a recognized opcode; `None` inner value means the
/// count is not checked (`SWZ` takes a variable swizzle component list).
fn opcode_arity(opcode: &str) -> Option<Option<usize>> {
    let arity = match opcode {
        "KIL" => Some(1),
        "ABS" | "COS" | "EX2" | "FLR" | "FRC" | "LG2" | "LIT" | "MOV" | "RCP" | "RSQ"
        | "SCS" | "SIN" => Some(2),
        "ADD" | "DP3" | "DP4" | "DPH" | "DST" | "MAX" | "MIN" | "MUL" | "POW" | "SGE"
        | "SLT" | "SUB" | "XPD" => Some(3),
        "CMP" | "LRP" | "MAD" => Some(4),
        "TEX" | "TXB" | "TXP" => Some(4),
        "SWZ" => None,
        _ => return None,
    };
    Some(arity)
}

/// Count comma-separated operands, treating `{ ... }` vector literals as a
/// single operand.
fn count_operands(rest: &str) -> usize {
    if rest.is_empty() {
        return 0;
    }
    let mut depth = 0usize;
    let mut count = 1;
    for c in rest.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => count += 1,
            _ => {}
        }
    }
    count
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Trim trailing whitespace, collapse runs of blank lines, and drop blanks
/// at either end, so that identical inputs always produce byte-identical
/// output.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_pending = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_pending = !out.is_empty();
            continue;
        }
        if blank_pending {
            out.push('\n');
            blank_pending = false;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
