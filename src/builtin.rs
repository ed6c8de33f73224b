//! Standard library for the Ember scripting language
//!
//! The VM itself only knows about the core opcodes (`PRINT`, `LEN`, `PUSH`,
//! `POP_ARRAY`, `TIME`, `INPUT`) and the pre-registered `__range__` global;
//! everything below is an ordinary host-callable, built the same way an
//! embedder would build its own, and handed to [`crate::vm::VM::define_global`]
//! before the program runs. None of it is special-cased by the dispatch loop.
//!
//! ## Function categories
//!
//! - **Math**: `abs`, `min`, `max`, `floor`, `ceil`, `round`, `sqrt`, `pow`,
//!   `log`, `log10`, `sin`, `cos`, `tan`, plus the constants `PI` and `E`.
//! - **Conversion**: `str`, `int`, `float`.
//! - **String**: `split`, `join`, `upper`, `lower`, `strip`, `replace`,
//!   `contains`, `starts_with`, `ends_with`, `char_at`, `char_code`,
//!   `from_char_code`.
//! - **Array**: `reverse`, `sort`, `sort_by`, `filter`, `map`, `reduce`,
//!   `sum`, `find`, `index_of`, `slice`, `concat`, `flatten`, `unique`, `zip`.
//! - **Random**: `random`, `random_int`, `random_choice`, `shuffle`.
//! - **Type introspection**: `type_of`, `is_array`, `is_string`, `is_number`,
//!   `is_function`.
//! - **File I/O**: `read_file`, `write_file`, `read_lines`.
//!
//! `filter`, `map`, `reduce`, `find`, and `sort_by` accept a compiled
//! function or another host-callable as their predicate/transform and
//! invoke it through [`crate::vm::VM::invoke`], re-entering the same
//! call/return machinery `CALL` uses rather than a second evaluator.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;

use crate::error::{EmberError, Result};
use crate::vm::{normalize_index, Value, VM};

/// Registers every standard-library function and constant into `vm`'s
/// globals. Called once by the CLI before [`crate::vm::VM::run`].
pub fn install(vm: &mut VM) {
    vm.define_global("PI", Value::Float(std::f64::consts::PI));
    vm.define_global("E", Value::Float(std::f64::consts::E));

    vm.define_global("abs", Value::host_fn(math_abs));
    vm.define_global("min", Value::host_fn(math_min));
    vm.define_global("max", Value::host_fn(math_max));
    vm.define_global("floor", Value::host_fn(math_floor));
    vm.define_global("ceil", Value::host_fn(math_ceil));
    vm.define_global("round", Value::host_fn(math_round));
    vm.define_global("sqrt", Value::host_fn(math_sqrt));
    vm.define_global("pow", Value::host_fn(math_pow));
    vm.define_global("log", Value::host_fn(math_log));
    vm.define_global("log10", Value::host_fn(math_log10));
    vm.define_global("sin", Value::host_fn(math_sin));
    vm.define_global("cos", Value::host_fn(math_cos));
    vm.define_global("tan", Value::host_fn(math_tan));

    vm.define_global("str", Value::host_fn(conv_str));
    vm.define_global("int", Value::host_fn(conv_int));
    vm.define_global("float", Value::host_fn(conv_float));

    vm.define_global("split", Value::host_fn(str_split));
    vm.define_global("join", Value::host_fn(str_join));
    vm.define_global("upper", Value::host_fn(str_upper));
    vm.define_global("lower", Value::host_fn(str_lower));
    vm.define_global("strip", Value::host_fn(str_strip));
    vm.define_global("replace", Value::host_fn(str_replace));
    vm.define_global("contains", Value::host_fn(str_contains));
    vm.define_global("starts_with", Value::host_fn(str_starts_with));
    vm.define_global("ends_with", Value::host_fn(str_ends_with));
    vm.define_global("char_at", Value::host_fn(str_char_at));
    vm.define_global("char_code", Value::host_fn(str_char_code));
    vm.define_global("from_char_code", Value::host_fn(str_from_char_code));

    vm.define_global("reverse", Value::host_fn(arr_reverse));
    vm.define_global("sort", Value::host_fn(arr_sort));
    vm.define_global("sort_by", Value::host_fn(arr_sort_by));
    vm.define_global("filter", Value::host_fn(arr_filter));
    vm.define_global("map", Value::host_fn(arr_map));
    vm.define_global("reduce", Value::host_fn(arr_reduce));
    vm.define_global("sum", Value::host_fn(arr_sum));
    vm.define_global("find", Value::host_fn(arr_find));
    vm.define_global("index_of", Value::host_fn(arr_index_of));
    vm.define_global("slice", Value::host_fn(arr_slice));
    vm.define_global("concat", Value::host_fn(arr_concat));
    vm.define_global("flatten", Value::host_fn(arr_flatten));
    vm.define_global("unique", Value::host_fn(arr_unique));
    vm.define_global("zip", Value::host_fn(arr_zip));

    vm.define_global("random", Value::host_fn(rand_random));
    vm.define_global("random_int", Value::host_fn(rand_random_int));
    vm.define_global("random_choice", Value::host_fn(rand_random_choice));
    vm.define_global("shuffle", Value::host_fn(rand_shuffle));

    vm.define_global("type_of", Value::host_fn(type_of));
    vm.define_global("is_array", Value::host_fn(is_array));
    vm.define_global("is_string", Value::host_fn(is_string));
    vm.define_global("is_number", Value::host_fn(is_number));
    vm.define_global("is_function", Value::host_fn(is_function));

    vm.define_global("read_file", Value::host_fn(io_read_file));
    vm.define_global("write_file", Value::host_fn(io_write_file));
    vm.define_global("read_lines", Value::host_fn(io_read_lines));
}

fn arity_error(vm: &VM, name: &str, expected: &str, got: usize) -> EmberError {
    EmberError::ArgumentError {
        message: format!("{} expects {} argument(s), got {}", name, expected, got),
        line: vm.line(),
    }
}

fn type_error(vm: &VM, message: impl Into<String>) -> EmberError {
    EmberError::TypeMismatch {
        message: message.into(),
        line: vm.line(),
    }
}

fn as_number(vm: &VM, name: &str, v: &Value) -> Result<f64> {
    v.numeric()
        .ok_or_else(|| type_error(vm, format!("{} argument must be a number, got {}", name, v.type_name())))
}

fn as_int(vm: &VM, name: &str, v: &Value) -> Result<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        other => Err(type_error(vm, format!("{} argument must be a number, got {}", name, other.type_name()))),
    }
}

fn as_str<'a>(vm: &VM, name: &str, v: &'a Value) -> Result<&'a str> {
    match v {
        Value::Str(s) => Ok(s.as_str()),
        other => Err(type_error(vm, format!("{} argument must be a string, got {}", name, other.type_name()))),
    }
}

fn as_array(vm: &VM, name: &str, v: &Value) -> Result<Rc<RefCell<Vec<Value>>>> {
    match v {
        Value::Array(items) => Ok(items.clone()),
        other => Err(type_error(vm, format!("{} argument must be an array, got {}", name, other.type_name()))),
    }
}

// --- Math -------------------------------------------------------------

fn math_abs(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "abs", "1", args.len()));
    }
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(type_error(vm, format!("abs argument must be a number, got {}", other.type_name()))),
    }
}

fn math_min(vm: &mut VM, args: &[Value]) -> Result<Value> {
    reduce_numeric(vm, "min", args, f64::min, i64::min)
}

fn math_max(vm: &mut VM, args: &[Value]) -> Result<Value> {
    reduce_numeric(vm, "max", args, f64::max, i64::max)
}

/// Shared implementation for `min`/`max`: variadic over scalar arguments, or
/// a single array argument.
fn reduce_numeric(
    vm: &VM,
    name: &str,
    args: &[Value],
    f_op: fn(f64, f64) -> f64,
    i_op: fn(i64, i64) -> i64,
) -> Result<Value> {
    let values: Vec<Value> = if args.len() == 1 {
        if let Value::Array(items) = &args[0] {
            items.borrow().clone()
        } else {
            vec![args[0].clone()]
        }
    } else {
        args.to_vec()
    };

    if values.is_empty() {
        return Err(arity_error(vm, name, "at least 1", 0));
    }

    let all_int = values.iter().all(|v| matches!(v, Value::Int(_)));
    if all_int {
        let mut acc = as_int(vm, name, &values[0])?;
        for v in &values[1..] {
            acc = i_op(acc, as_int(vm, name, v)?);
        }
        Ok(Value::Int(acc))
    } else {
        let mut acc = as_number(vm, name, &values[0])?;
        for v in &values[1..] {
            acc = f_op(acc, as_number(vm, name, v)?);
        }
        Ok(Value::Float(acc))
    }
}

fn math_floor(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "floor", "1", args.len()));
    }
    Ok(Value::Int(as_number(vm, "floor", &args[0])?.floor() as i64))
}

fn math_ceil(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "ceil", "1", args.len()));
    }
    Ok(Value::Int(as_number(vm, "ceil", &args[0])?.ceil() as i64))
}

fn math_round(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "round", "1", args.len()));
    }
    Ok(Value::Int(as_number(vm, "round", &args[0])?.round() as i64))
}

fn math_sqrt(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "sqrt", "1", args.len()));
    }
    let n = as_number(vm, "sqrt", &args[0])?;
    if n < 0.0 {
        return Err(EmberError::ArgumentError {
            message: "sqrt of a negative number".to_string(),
            line: vm.line(),
        });
    }
    Ok(Value::Float(n.sqrt()))
}

fn math_pow(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "pow", "2", args.len()));
    }
    if let (Value::Int(base), Value::Int(exp)) = (&args[0], &args[1]) {
        if *exp >= 0 {
            return Ok(Value::Int(base.wrapping_pow(*exp as u32)));
        }
    }
    let base = as_number(vm, "pow", &args[0])?;
    let exp = as_number(vm, "pow", &args[1])?;
    Ok(Value::Float(base.powf(exp)))
}

fn math_log(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "log", "1", args.len()));
    }
    Ok(Value::Float(as_number(vm, "log", &args[0])?.ln()))
}

fn math_log10(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "log10", "1", args.len()));
    }
    Ok(Value::Float(as_number(vm, "log10", &args[0])?.log10()))
}

fn math_sin(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "sin", "1", args.len()));
    }
    Ok(Value::Float(as_number(vm, "sin", &args[0])?.sin()))
}

fn math_cos(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "cos", "1", args.len()));
    }
    Ok(Value::Float(as_number(vm, "cos", &args[0])?.cos()))
}

fn math_tan(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "tan", "1", args.len()));
    }
    Ok(Value::Float(as_number(vm, "tan", &args[0])?.tan()))
}

// --- Conversion ---------------------------------------------------------

fn conv_str(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "str", "1", args.len()));
    }
    Ok(Value::str(args[0].to_string()))
}

fn conv_int(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "int", "1", args.len()));
    }
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EmberError::ArgumentError {
                message: format!("cannot convert \"{}\" to int", s),
                line: vm.line(),
            }),
        other => Err(type_error(vm, format!("cannot convert {} to int", other.type_name()))),
    }
}

fn conv_float(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "float", "1", args.len()));
    }
    match &args[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EmberError::ArgumentError {
                message: format!("cannot convert \"{}\" to float", s),
                line: vm.line(),
            }),
        other => Err(type_error(vm, format!("cannot convert {} to float", other.type_name()))),
    }
}

// --- String ---------------------------------------------------------------

fn str_split(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "split", "2", args.len()));
    }
    let s = as_str(vm, "split", &args[0])?;
    let sep = as_str(vm, "split", &args[1])?;
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::str).collect()
    };
    Ok(Value::array(parts))
}

fn str_join(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "join", "2", args.len()));
    }
    let items = as_array(vm, "join", &args[0])?;
    let sep = as_str(vm, "join", &args[1])?;
    let joined = items
        .borrow()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep);
    Ok(Value::str(joined))
}

fn str_upper(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "upper", "1", args.len()));
    }
    Ok(Value::str(as_str(vm, "upper", &args[0])?.to_uppercase()))
}

fn str_lower(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "lower", "1", args.len()));
    }
    Ok(Value::str(as_str(vm, "lower", &args[0])?.to_lowercase()))
}

fn str_strip(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "strip", "1", args.len()));
    }
    Ok(Value::str(as_str(vm, "strip", &args[0])?.trim().to_string()))
}

fn str_replace(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 3 {
        return Err(arity_error(vm, "replace", "3", args.len()));
    }
    let s = as_str(vm, "replace", &args[0])?;
    let from = as_str(vm, "replace", &args[1])?;
    let to = as_str(vm, "replace", &args[2])?;
    Ok(Value::str(s.replace(from, to)))
}

fn str_contains(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "contains", "2", args.len()));
    }
    let s = as_str(vm, "contains", &args[0])?;
    let needle = as_str(vm, "contains", &args[1])?;
    Ok(Value::Bool(s.contains(needle)))
}

fn str_starts_with(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "starts_with", "2", args.len()));
    }
    let s = as_str(vm, "starts_with", &args[0])?;
    let prefix = as_str(vm, "starts_with", &args[1])?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn str_ends_with(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "ends_with", "2", args.len()));
    }
    let s = as_str(vm, "ends_with", &args[0])?;
    let suffix = as_str(vm, "ends_with", &args[1])?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

fn str_char_at(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "char_at", "2", args.len()));
    }
    let s = as_str(vm, "char_at", &args[0])?;
    let idx = as_int(vm, "char_at", &args[1])?;
    let chars: Vec<char> = s.chars().collect();
    let normalized = normalize_index(idx, chars.len());
    match normalized {
        Some(i) => Ok(Value::str(chars[i].to_string())),
        None => Err(EmberError::IndexOutOfBounds {
            index: idx,
            len: chars.len(),
            line: vm.line(),
        }),
    }
}

fn str_char_code(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "char_code", "1", args.len()));
    }
    let s = as_str(vm, "char_code", &args[0])?;
    let first = s.chars().next().ok_or_else(|| EmberError::ArgumentError {
        message: "char_code argument must be a non-empty string".to_string(),
        line: vm.line(),
    })?;
    Ok(Value::Int(first as i64))
}

fn str_from_char_code(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "from_char_code", "1", args.len()));
    }
    let code = as_int(vm, "from_char_code", &args[0])?;
    let c = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| EmberError::ArgumentError {
            message: format!("{} is not a valid character code", code),
            line: vm.line(),
        })?;
    Ok(Value::str(c.to_string()))
}

// --- Array ------------------------------------------------------------

fn arr_reverse(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "reverse", "1", args.len()));
    }
    let items = as_array(vm, "reverse", &args[0])?;
    let mut out = items.borrow().clone();
    out.reverse();
    Ok(Value::array(out))
}

fn arr_sort(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "sort", "1", args.len()));
    }
    let items = as_array(vm, "sort", &args[0])?;
    let mut out = items.borrow().clone();
    sort_values(vm, &mut out)?;
    Ok(Value::array(out))
}

/// Shared comparator for `sort`/`sort_by`: numeric-vs-numeric or
/// string-vs-string compare directly; anything else (two arrays, two
/// nulls, mixed types, …) is not comparable and reports `err` via the
/// out-parameter rather than falling back to a silent `Equal`.
fn compare_values(
    vm: &VM,
    a: &Value,
    b: &Value,
    err: &mut Option<EmberError>,
) -> std::cmp::Ordering {
    if err.is_some() {
        return std::cmp::Ordering::Equal;
    }
    match (a.numeric(), b.numeric()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => match (a, b) {
            (Value::Str(x), Value::Str(y)) => x.cmp(y),
            _ => {
                *err = Some(type_error(vm, "sort requires an array of comparable values"));
                std::cmp::Ordering::Equal
            }
        },
    }
}

fn sort_values(vm: &VM, values: &mut [Value]) -> Result<()> {
    let mut err = None;
    values.sort_by(|a, b| compare_values(vm, a, b, &mut err));
    match err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn arr_sort_by(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "sort_by", "2", args.len()));
    }
    let items = as_array(vm, "sort_by", &args[0])?;
    let callback = args[1].clone();
    let mut out = items.borrow().clone();

    // `Vec::sort_by` takes an infallible comparator, but the callback can
    // itself error, so compute every key up front through one `invoke` per
    // element rather than per comparison, then sort by the precomputed keys.
    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(out.len());
    for v in out.drain(..) {
        let key = vm.invoke(&callback, vec![v.clone()])?;
        keyed.push((key, v));
    }
    let mut err = None;
    keyed.sort_by(|(ka, _), (kb, _)| compare_values(vm, ka, kb, &mut err));
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Value::array(keyed.into_iter().map(|(_, v)| v).collect()))
}

fn arr_filter(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "filter", "2", args.len()));
    }
    let items = as_array(vm, "filter", &args[0])?;
    let predicate = args[1].clone();
    let source = items.borrow().clone();
    let mut out = Vec::new();
    for v in source {
        if vm.invoke(&predicate, vec![v.clone()])?.is_truthy() {
            out.push(v);
        }
    }
    Ok(Value::array(out))
}

fn arr_map(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "map", "2", args.len()));
    }
    let items = as_array(vm, "map", &args[0])?;
    let transform = args[1].clone();
    let source = items.borrow().clone();
    let mut out = Vec::with_capacity(source.len());
    for v in source {
        out.push(vm.invoke(&transform, vec![v])?);
    }
    Ok(Value::array(out))
}

fn arr_reduce(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 3 {
        return Err(arity_error(vm, "reduce", "3", args.len()));
    }
    let items = as_array(vm, "reduce", &args[0])?;
    let reducer = args[1].clone();
    let mut acc = args[2].clone();
    for v in items.borrow().iter() {
        acc = vm.invoke(&reducer, vec![acc, v.clone()])?;
    }
    Ok(acc)
}

fn arr_sum(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "sum", "1", args.len()));
    }
    let items = as_array(vm, "sum", &args[0])?;
    let values = items.borrow();
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: i64 = 0;
        for v in values.iter() {
            total = total.wrapping_add(as_int(vm, "sum", v)?);
        }
        Ok(Value::Int(total))
    } else {
        let mut total = 0.0;
        for v in values.iter() {
            total += as_number(vm, "sum", v)?;
        }
        Ok(Value::Float(total))
    }
}

fn arr_find(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "find", "2", args.len()));
    }
    let items = as_array(vm, "find", &args[0])?;
    let predicate = args[1].clone();
    let source = items.borrow().clone();
    for v in source {
        if vm.invoke(&predicate, vec![v.clone()])?.is_truthy() {
            return Ok(v);
        }
    }
    Ok(Value::Null)
}

fn arr_index_of(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "index_of", "2", args.len()));
    }
    let items = as_array(vm, "index_of", &args[0])?;
    let needle = &args[1];
    let pos = items
        .borrow()
        .iter()
        .position(|v| values_loosely_equal(v, needle));
    Ok(Value::Int(pos.map(|i| i as i64).unwrap_or(-1)))
}

fn arr_slice(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 3 {
        return Err(arity_error(vm, "slice", "3", args.len()));
    }
    let items = as_array(vm, "slice", &args[0])?;
    let values = items.borrow();
    let len = values.len();
    let start = clamp_slice_bound(as_int(vm, "slice", &args[1])?, len);
    let end = clamp_slice_bound(as_int(vm, "slice", &args[2])?, len);
    if start >= end {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(values[start..end].to_vec()))
}

fn clamp_slice_bound(index: i64, len: usize) -> usize {
    let resolved = if index < 0 { index + len as i64 } else { index };
    resolved.clamp(0, len as i64) as usize
}

fn arr_concat(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "concat", "2", args.len()));
    }
    let a = as_array(vm, "concat", &args[0])?;
    let b = as_array(vm, "concat", &args[1])?;
    let mut out = a.borrow().clone();
    out.extend(b.borrow().iter().cloned());
    Ok(Value::array(out))
}

fn arr_flatten(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "flatten", "1", args.len()));
    }
    let items = as_array(vm, "flatten", &args[0])?;
    let mut out = Vec::new();
    for v in items.borrow().iter() {
        match v {
            Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::array(out))
}

fn arr_unique(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "unique", "1", args.len()));
    }
    let items = as_array(vm, "unique", &args[0])?;
    let mut out: Vec<Value> = Vec::new();
    for v in items.borrow().iter() {
        if !out.iter().any(|seen| values_loosely_equal(seen, v)) {
            out.push(v.clone());
        }
    }
    Ok(Value::array(out))
}

fn arr_zip(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "zip", "2", args.len()));
    }
    let a = as_array(vm, "zip", &args[0])?;
    let b = as_array(vm, "zip", &args[1])?;
    let a = a.borrow();
    let b = b.borrow();
    let len = a.len().min(b.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(Value::array(vec![a[i].clone(), b[i].clone()]));
    }
    Ok(Value::array(out))
}

/// Value equality for `index_of`/`unique`, which need to compare without
/// the VM's constant-pool type strictness (so `1` and `1.0` match).
fn values_loosely_equal(a: &Value, b: &Value) -> bool {
    match (a.numeric(), b.numeric()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a, b) {
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Null, Value::Null) => true,
            _ => false,
        },
    }
}

// --- Random -------------------------------------------------------------

fn rand_random(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if !args.is_empty() {
        return Err(arity_error(vm, "random", "0", args.len()));
    }
    Ok(Value::Float(rand::thread_rng().gen::<f64>()))
}

fn rand_random_int(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "random_int", "2", args.len()));
    }
    let lo = as_int(vm, "random_int", &args[0])?;
    let hi = as_int(vm, "random_int", &args[1])?;
    if lo > hi {
        return Err(EmberError::ArgumentError {
            message: format!("random_int range [{}, {}] is empty", lo, hi),
            line: vm.line(),
        });
    }
    Ok(Value::Int(rand::thread_rng().gen_range(lo..=hi)))
}

fn rand_random_choice(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "random_choice", "1", args.len()));
    }
    let items = as_array(vm, "random_choice", &args[0])?;
    let values = items.borrow();
    if values.is_empty() {
        return Err(EmberError::ArgumentError {
            message: "random_choice of an empty array".to_string(),
            line: vm.line(),
        });
    }
    let i = rand::thread_rng().gen_range(0..values.len());
    Ok(values[i].clone())
}

fn rand_shuffle(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "shuffle", "1", args.len()));
    }
    let items = as_array(vm, "shuffle", &args[0])?;
    let mut out = items.borrow().clone();
    let mut rng = rand::thread_rng();
    for i in (1..out.len()).rev() {
        let j = rng.gen_range(0..=i);
        out.swap(i, j);
    }
    Ok(Value::array(out))
}

// --- Type introspection -------------------------------------------------

fn type_of(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "type_of", "1", args.len()));
    }
    Ok(Value::str(args[0].type_name()))
}

fn is_array(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "is_array", "1", args.len()));
    }
    Ok(Value::Bool(matches!(args[0], Value::Array(_))))
}

fn is_string(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "is_string", "1", args.len()));
    }
    Ok(Value::Bool(matches!(args[0], Value::Str(_))))
}

fn is_number(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "is_number", "1", args.len()));
    }
    Ok(Value::Bool(matches!(args[0], Value::Int(_) | Value::Float(_))))
}

fn is_function(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "is_function", "1", args.len()));
    }
    Ok(Value::Bool(matches!(
        args[0],
        Value::Fn(_) | Value::HostFn(_)
    )))
}

// --- File I/O -------------------------------------------------------------

fn io_read_file(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "read_file", "1", args.len()));
    }
    let path = as_str(vm, "read_file", &args[0])?;
    let contents = std::fs::read_to_string(path)?;
    Ok(Value::str(contents))
}

fn io_write_file(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(arity_error(vm, "write_file", "2", args.len()));
    }
    let path = as_str(vm, "write_file", &args[0])?;
    let contents = as_str(vm, "write_file", &args[1])?;
    std::fs::write(path, contents)?;
    Ok(Value::Null)
}

fn io_read_lines(vm: &mut VM, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(arity_error(vm, "read_lines", "1", args.len()));
    }
    let path = as_str(vm, "read_lines", &args[0])?;
    let contents = std::fs::read_to_string(path)?;
    let lines = contents.lines().map(Value::str).collect();
    Ok(Value::array(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_program;

    fn run(src: &str) -> Value {
        let chunk = compile_program(src).expect("compile failed");
        let mut vm = VM::new(chunk);
        install(&mut vm);
        vm.run().expect("run failed")
    }

    #[test]
    fn map_doubles_each_element() {
        let v = run("fn double(x: int) return x * 2 end let r = map([1,2,3], double) r[0]+r[1]+r[2]");
        assert!(matches!(v, Value::Int(12)));
    }

    #[test]
    fn filter_keeps_matching_elements() {
        let v = run("fn even(x: int) return x % 2 == 0 end len(filter([1,2,3,4,5], even))");
        assert!(matches!(v, Value::Int(2)));
    }

    #[test]
    fn reduce_sums_with_seed() {
        let v = run("fn add(acc: int, x: int) return acc + x end reduce([1,2,3,4], add, 0)");
        assert!(matches!(v, Value::Int(10)));
    }

    #[test]
    fn sort_by_orders_by_callback_key() {
        let v = run("fn neg(x: int) return 0 - x end sort_by([3,1,2], neg)");
        match v {
            Value::Array(items) => {
                let items = items.borrow();
                assert!(matches!(items[0], Value::Int(3)));
                assert!(matches!(items[1], Value::Int(2)));
                assert!(matches!(items[2], Value::Int(1)));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn string_helpers_roundtrip() {
        let v = run("join(split(\"a,b,c\", \",\"), \"-\")");
        match v {
            Value::Str(s) => assert_eq!(s.as_str(), "a-b-c"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn random_int_stays_in_range() {
        let v = run("random_int(5, 5)");
        assert!(matches!(v, Value::Int(5)));
    }

    #[test]
    fn unique_drops_duplicate_values() {
        let v = run("len(unique([1,1,2,2,3]))");
        assert!(matches!(v, Value::Int(3)));
    }

    fn run_err(src: &str) -> EmberError {
        let chunk = compile_program(src).expect("compile failed");
        let mut vm = VM::new(chunk);
        install(&mut vm);
        vm.run().expect_err("expected a runtime error")
    }

    #[test]
    fn sort_rejects_non_comparable_values() {
        let err = run_err("sort([[1], [2]])");
        assert!(matches!(err, EmberError::TypeMismatch { .. }));
    }

    #[test]
    fn sort_by_rejects_non_comparable_keys() {
        let err = run_err("fn key(x: int) return [x] end sort_by([1,2], key)");
        assert!(matches!(err, EmberError::TypeMismatch { .. }));
    }

    #[test]
    fn abs_of_int_min_does_not_panic() {
        let v = run("let x = -9223372036854775807 - 1\nabs(x)");
        assert!(matches!(v, Value::Int(i64::MIN)));
    }
}
