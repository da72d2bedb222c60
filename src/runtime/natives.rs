use crate::runtime::value::{NativeFunction, Value};
use indexmap::IndexMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Per-script overlay over the process-wide built-in table. Lookup goes
/// overlay first, so a script can shadow a built-in without other scripts
/// noticing.
#[derive(Clone, Default)]
pub struct Registry {
    overlay: HashMap<String, NativeFunction>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.overlay
            .insert(name.to_string(), NativeFunction::new(name, func));
    }

    pub fn lookup(&self, name: &str) -> Option<NativeFunction> {
        self.overlay
            .get(name)
            .or_else(|| builtins().get(name))
            .cloned()
    }
}

/// The process-wide built-in catalog, populated once and read-only after.
pub fn builtins() -> &'static HashMap<String, NativeFunction> {
    static BUILTINS: OnceLock<HashMap<String, NativeFunction>> = OnceLock::new();
    BUILTINS.get_or_init(|| {
        let mut map = HashMap::new();
        let add = |map: &mut HashMap<String, NativeFunction>,
                   name: &'static str,
                   func: fn(&[Value]) -> Result<Value, String>| {
            map.insert(name.to_string(), NativeFunction::new(name, func));
        };

        // String functions
        add(&mut map, "toString", native_to_string);
        add(&mut map, "toNumber", native_to_number);
        add(&mut map, "length", native_length);
        add(&mut map, "substring", native_substring);
        add(&mut map, "toUpperCase", native_to_upper_case);
        add(&mut map, "toLowerCase", native_to_lower_case);
        add(&mut map, "trim", native_trim);
        add(&mut map, "split", native_split);
        add(&mut map, "join", native_join);
        add(&mut map, "replace", native_replace);
        add(&mut map, "contains", native_contains);
        add(&mut map, "startsWith", native_starts_with);
        add(&mut map, "endsWith", native_ends_with);
        add(&mut map, "indexOf", native_index_of);

        // JSON functions
        add(&mut map, "jsonParse", native_json_parse);
        add(&mut map, "jsonStringify", native_json_stringify);

        // Type checking
        add(&mut map, "typeOf", native_type_of);
        add(&mut map, "isNull", native_is_null);
        add(&mut map, "isNumber", native_is_number);
        add(&mut map, "isString", native_is_string);
        add(&mut map, "isBool", native_is_bool);

        // Math functions
        add(&mut map, "abs", native_abs);
        add(&mut map, "floor", native_floor);
        add(&mut map, "ceil", native_ceil);
        add(&mut map, "round", native_round);
        add(&mut map, "min", native_min);
        add(&mut map, "max", native_max);
        add(&mut map, "pow", native_pow);
        add(&mut map, "sqrt", native_sqrt);
        add(&mut map, "sin", native_sin);
        add(&mut map, "cos", native_cos);
        add(&mut map, "tan", native_tan);
        add(&mut map, "log", native_log);
        add(&mut map, "log10", native_log10);
        add(&mut map, "exp", native_exp);

        // Random functions
        add(&mut map, "random", native_random);
        add(&mut map, "randomInt", native_random_int);
        add(&mut map, "randomUUID", native_random_uuid);

        // Hashing
        add(&mut map, "sha256", native_sha256);

        // Array functions
        add(&mut map, "sort", native_sort);
        add(&mut map, "sortBy", native_sort_by);
        add(&mut map, "reverse", native_reverse);
        add(&mut map, "size", native_size);
        add(&mut map, "first", native_first);
        add(&mut map, "last", native_last);
        add(&mut map, "slice", native_slice);

        map
    })
}

// ============ argument helpers ============

fn arity(name: &str, args: &[Value], n: usize) -> Result<(), String> {
    if args.len() != n {
        let noun = if n == 1 { "argument" } else { "arguments" };
        return Err(format!("{name} requires {n} {noun}"));
    }
    Ok(())
}

fn ordinal(index: usize) -> &'static str {
    match index {
        0 => "first",
        1 => "second",
        2 => "third",
        _ => "later",
    }
}

fn string_of<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str, String> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        _ => Err(format!(
            "{name} requires a string as {} argument",
            ordinal(index)
        )),
    }
}

fn number_of(name: &str, args: &[Value], index: usize) -> Result<f64, String> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        _ => Err(format!(
            "{name} requires a number as {} argument",
            ordinal(index)
        )),
    }
}

fn array_of(name: &str, args: &[Value], index: usize) -> Result<Vec<Value>, String> {
    match args.get(index) {
        Some(Value::Array(items)) => Ok(items.borrow().clone()),
        _ => Err(format!(
            "{name} requires an array as {} argument",
            ordinal(index)
        )),
    }
}

// ============ String functions ============

fn native_to_string(args: &[Value]) -> Result<Value, String> {
    arity("toString", args, 1)?;
    Ok(Value::Str(args[0].render()))
}

fn native_to_number(args: &[Value]) -> Result<Value, String> {
    arity("toNumber", args, 1)?;
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| format!("cannot convert '{s}' to number")),
        other => Err(format!("cannot convert {} to number", other.type_name())),
    }
}

fn native_length(args: &[Value]) -> Result<Value, String> {
    arity("length", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        _ => Err("length requires a string argument".into()),
    }
}

fn native_substring(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("substring requires 2 or 3 arguments".into());
    }
    let s = string_of("substring", args, 0)?;
    let chars: Vec<char> = s.chars().collect();
    let start = (number_of("substring", args, 1)? as i64).max(0) as usize;
    if start >= chars.len() {
        return Ok(Value::Str(String::new()));
    }
    let end = if args.len() == 3 {
        (number_of("substring", args, 2)? as i64).max(0) as usize
    } else {
        chars.len()
    };
    let end = end.min(chars.len());
    if end <= start {
        return Ok(Value::Str(String::new()));
    }
    Ok(Value::Str(chars[start..end].iter().collect()))
}

fn native_to_upper_case(args: &[Value]) -> Result<Value, String> {
    arity("toUpperCase", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
        _ => Err("toUpperCase requires a string argument".into()),
    }
}

fn native_to_lower_case(args: &[Value]) -> Result<Value, String> {
    arity("toLowerCase", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.to_lowercase())),
        _ => Err("toLowerCase requires a string argument".into()),
    }
}

fn native_trim(args: &[Value]) -> Result<Value, String> {
    arity("trim", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.trim().to_string())),
        _ => Err("trim requires a string argument".into()),
    }
}

fn native_split(args: &[Value]) -> Result<Value, String> {
    arity("split", args, 2)?;
    let s = string_of("split", args, 0)?;
    let sep = string_of("split", args, 1)?;
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        s.split(sep).map(|p| Value::Str(p.to_string())).collect()
    };
    Ok(Value::array(parts))
}

fn native_join(args: &[Value]) -> Result<Value, String> {
    arity("join", args, 2)?;
    let items = array_of("join", args, 0)?;
    let sep = string_of("join", args, 1)?;
    let joined = items
        .iter()
        .map(Value::render)
        .collect::<Vec<_>>()
        .join(sep);
    Ok(Value::Str(joined))
}

fn native_replace(args: &[Value]) -> Result<Value, String> {
    arity("replace", args, 3)?;
    let s = string_of("replace", args, 0)?;
    let from = string_of("replace", args, 1)?;
    let to = string_of("replace", args, 2)?;
    Ok(Value::Str(s.replace(from, to)))
}

fn native_contains(args: &[Value]) -> Result<Value, String> {
    arity("contains", args, 2)?;
    let s = string_of("contains", args, 0)?;
    let sub = string_of("contains", args, 1)?;
    Ok(Value::Bool(s.contains(sub)))
}

fn native_starts_with(args: &[Value]) -> Result<Value, String> {
    arity("startsWith", args, 2)?;
    let s = string_of("startsWith", args, 0)?;
    let prefix = string_of("startsWith", args, 1)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn native_ends_with(args: &[Value]) -> Result<Value, String> {
    arity("endsWith", args, 2)?;
    let s = string_of("endsWith", args, 0)?;
    let suffix = string_of("endsWith", args, 1)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

fn native_index_of(args: &[Value]) -> Result<Value, String> {
    arity("indexOf", args, 2)?;
    let s = string_of("indexOf", args, 0)?;
    let sub = string_of("indexOf", args, 1)?;
    let index = match s.find(sub) {
        Some(byte_pos) => s[..byte_pos].chars().count() as f64,
        None => -1.0,
    };
    Ok(Value::Number(index))
}

// ============ JSON functions ============

fn native_json_parse(args: &[Value]) -> Result<Value, String> {
    arity("jsonParse", args, 1)?;
    let s = string_of("jsonParse", args, 0)?;
    let parsed: serde_json::Value =
        serde_json::from_str(s).map_err(|err| format!("invalid JSON: {err}"))?;
    Ok(json_to_value(&parsed))
}

fn native_json_stringify(args: &[Value]) -> Result<Value, String> {
    arity("jsonStringify", args, 1)?;
    let json = value_to_json(&args[0])?;
    serde_json::to_string(&json).map(Value::Str).map_err(|err| format!("cannot stringify: {err}"))
}

fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(entries) => {
            let mut pairs = IndexMap::new();
            for (key, value) in entries {
                pairs.insert(key.clone(), json_to_value(value));
            }
            Value::object(pairs)
        }
    }
}

fn value_to_json(v: &Value) -> Result<serde_json::Value, String> {
    match v {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
                Ok(serde_json::Value::from(*n as i64))
            } else {
                serde_json::Number::from_f64(*n)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| "cannot stringify non-finite number".to_string())
            }
        }
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.borrow().len());
            for item in items.borrow().iter() {
                out.push(value_to_json(item)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Object(pairs) => {
            let mut out = serde_json::Map::new();
            for (key, value) in pairs.borrow().iter() {
                out.insert(key.clone(), value_to_json(value)?);
            }
            Ok(serde_json::Value::Object(out))
        }
        other => Err(format!("cannot stringify {}", other.type_name())),
    }
}

// ============ Type functions ============

fn native_type_of(args: &[Value]) -> Result<Value, String> {
    arity("typeOf", args, 1)?;
    let name = match &args[0] {
        Value::Null => "null",
        Value::Str(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::Function(_) | Value::Native(_) => "function",
        _ => "unknown",
    };
    Ok(Value::Str(name.to_string()))
}

fn native_is_null(args: &[Value]) -> Result<Value, String> {
    arity("isNull", args, 1)?;
    Ok(Value::Bool(args[0].is_null()))
}

fn native_is_number(args: &[Value]) -> Result<Value, String> {
    arity("isNumber", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Number(_))))
}

fn native_is_string(args: &[Value]) -> Result<Value, String> {
    arity("isString", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Str(_))))
}

fn native_is_bool(args: &[Value]) -> Result<Value, String> {
    arity("isBool", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

// ============ Math functions ============

fn native_abs(args: &[Value]) -> Result<Value, String> {
    arity("abs", args, 1)?;
    Ok(Value::Number(number_of("abs", args, 0)?.abs()))
}

fn native_floor(args: &[Value]) -> Result<Value, String> {
    arity("floor", args, 1)?;
    Ok(Value::Number(number_of("floor", args, 0)?.floor()))
}

fn native_ceil(args: &[Value]) -> Result<Value, String> {
    arity("ceil", args, 1)?;
    Ok(Value::Number(number_of("ceil", args, 0)?.ceil()))
}

fn native_round(args: &[Value]) -> Result<Value, String> {
    arity("round", args, 1)?;
    Ok(Value::Number(number_of("round", args, 0)?.round()))
}

fn native_min(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 {
        return Err("min requires at least 2 arguments".into());
    }
    let mut result = f64::INFINITY;
    for (index, arg) in args.iter().enumerate() {
        match arg.as_number() {
            Some(n) => result = result.min(n),
            None => return Err(format!("min requires number arguments, got {} at {index}", arg.type_name())),
        }
    }
    Ok(Value::Number(result))
}

fn native_max(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 {
        return Err("max requires at least 2 arguments".into());
    }
    let mut result = f64::NEG_INFINITY;
    for (index, arg) in args.iter().enumerate() {
        match arg.as_number() {
            Some(n) => result = result.max(n),
            None => return Err(format!("max requires number arguments, got {} at {index}", arg.type_name())),
        }
    }
    Ok(Value::Number(result))
}

fn native_pow(args: &[Value]) -> Result<Value, String> {
    arity("pow", args, 2)?;
    let base = number_of("pow", args, 0)?;
    let exp = number_of("pow", args, 1)?;
    Ok(Value::Number(base.powf(exp)))
}

fn native_sqrt(args: &[Value]) -> Result<Value, String> {
    arity("sqrt", args, 1)?;
    let n = number_of("sqrt", args, 0)?;
    if n < 0.0 {
        return Err("sqrt of negative number".into());
    }
    Ok(Value::Number(n.sqrt()))
}

fn native_sin(args: &[Value]) -> Result<Value, String> {
    arity("sin", args, 1)?;
    Ok(Value::Number(number_of("sin", args, 0)?.sin()))
}

fn native_cos(args: &[Value]) -> Result<Value, String> {
    arity("cos", args, 1)?;
    Ok(Value::Number(number_of("cos", args, 0)?.cos()))
}

fn native_tan(args: &[Value]) -> Result<Value, String> {
    arity("tan", args, 1)?;
    Ok(Value::Number(number_of("tan", args, 0)?.tan()))
}

fn native_log(args: &[Value]) -> Result<Value, String> {
    arity("log", args, 1)?;
    let n = number_of("log", args, 0)?;
    if n <= 0.0 {
        return Err("log of non-positive number".into());
    }
    Ok(Value::Number(n.ln()))
}

fn native_log10(args: &[Value]) -> Result<Value, String> {
    arity("log10", args, 1)?;
    let n = number_of("log10", args, 0)?;
    if n <= 0.0 {
        return Err("log10 of non-positive number".into());
    }
    Ok(Value::Number(n.log10()))
}

fn native_exp(args: &[Value]) -> Result<Value, String> {
    arity("exp", args, 1)?;
    Ok(Value::Number(number_of("exp", args, 0)?.exp()))
}

// ============ Random functions ============

fn native_random(args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err("random takes no arguments".into());
    }
    Ok(Value::Number(rand::thread_rng().gen::<f64>()))
}

fn native_random_int(args: &[Value]) -> Result<Value, String> {
    arity("randomInt", args, 2)?;
    let min = number_of("randomInt", args, 0)? as i64;
    let max = number_of("randomInt", args, 1)? as i64;
    if min >= max {
        return Err("randomInt: min must be less than max".into());
    }
    Ok(Value::Number(rand::thread_rng().gen_range(min..=max) as f64))
}

fn native_random_uuid(args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err("randomUUID takes no arguments".into());
    }
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Ok(Value::Str(format!(
        "{}-{}-{}-{}-{}",
        hex::encode(&bytes[0..4]),
        hex::encode(&bytes[4..6]),
        hex::encode(&bytes[6..8]),
        hex::encode(&bytes[8..10]),
        hex::encode(&bytes[10..16]),
    )))
}

// ============ Hashing ============

fn native_sha256(args: &[Value]) -> Result<Value, String> {
    arity("sha256", args, 1)?;
    let s = string_of("sha256", args, 0)?;
    Ok(Value::Str(hex::encode(Sha256::digest(s.as_bytes()))))
}

// ============ Array functions ============

fn sort_order(name: &str, args: &[Value], index: usize) -> Result<bool, String> {
    if args.len() <= index {
        return Ok(true);
    }
    let order = string_of(name, args, index)?;
    Ok(order != "desc")
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.render().cmp(&b.render()),
        },
    }
}

fn native_sort(args: &[Value]) -> Result<Value, String> {
    if args.is_empty() || args.len() > 2 {
        return Err("sort requires 1 or 2 arguments (array, [order])".into());
    }
    let mut items = array_of("sort", args, 0)?;
    let ascending = sort_order("sort", args, 1)?;
    items.sort_by(|a, b| {
        let ord = compare_values(a, b);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    Ok(Value::array(items))
}

fn native_sort_by(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("sortBy requires 2 or 3 arguments (array, field, [order])".into());
    }
    let mut items = array_of("sortBy", args, 0)?;
    let field = string_of("sortBy", args, 1)?.to_string();
    let ascending = sort_order("sortBy", args, 2)?;
    let field_of = |value: &Value| match value {
        Value::Object(pairs) => pairs.borrow().get(&field).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    };
    items.sort_by(|a, b| {
        let ord = compare_values(&field_of(a), &field_of(b));
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    Ok(Value::array(items))
}

fn native_reverse(args: &[Value]) -> Result<Value, String> {
    arity("reverse", args, 1)?;
    let mut items = array_of("reverse", args, 0)?;
    items.reverse();
    Ok(Value::array(items))
}

fn native_size(args: &[Value]) -> Result<Value, String> {
    arity("size", args, 1)?;
    match &args[0] {
        Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Object(pairs) => Ok(Value::Number(pairs.borrow().len() as f64)),
        _ => Err("size requires an array, string, or object".into()),
    }
}

fn native_first(args: &[Value]) -> Result<Value, String> {
    arity("first", args, 1)?;
    let items = array_of("first", args, 0)?;
    Ok(items.first().cloned().unwrap_or(Value::Null))
}

fn native_last(args: &[Value]) -> Result<Value, String> {
    arity("last", args, 1)?;
    let items = array_of("last", args, 0)?;
    Ok(items.last().cloned().unwrap_or(Value::Null))
}

fn native_slice(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("slice requires 2 or 3 arguments (array, start, [end])".into());
    }
    let items = array_of("slice", args, 0)?;
    let start = (number_of("slice", args, 1)? as i64).max(0) as usize;
    if start >= items.len() {
        return Ok(Value::array(Vec::new()));
    }
    let end = if args.len() == 3 {
        (number_of("slice", args, 2)? as i64).max(0) as usize
    } else {
        items.len()
    };
    let end = end.min(items.len());
    if end <= start {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(items[start..end].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let registry = Registry::new();
        let native = registry.lookup(name).expect("builtin should exist");
        native.call(args)
    }

    #[test]
    fn overlay_shadows_builtin() {
        let mut registry = Registry::new();
        registry.register("toUpperCase", |_args| Ok(Value::Str("SHADOWED".into())));
        let native = registry.lookup("toUpperCase").unwrap();
        assert_eq!(
            native.call(&[Value::Str("x".into())]).unwrap().render(),
            "SHADOWED"
        );

        // A fresh registry still sees the builtin.
        let original = Registry::new().lookup("toUpperCase").unwrap();
        assert_eq!(
            original.call(&[Value::Str("x".into())]).unwrap().render(),
            "X"
        );
    }

    #[test]
    fn string_helpers() {
        assert_eq!(call("toUpperCase", &["ab".into()]).unwrap().render(), "AB");
        assert_eq!(call("trim", &["  a  ".into()]).unwrap().render(), "a");
        assert_eq!(
            call("substring", &["hello".into(), 1.0.into(), 3.0.into()])
                .unwrap()
                .render(),
            "el"
        );
        assert_eq!(
            call("indexOf", &["hello".into(), "ll".into()])
                .unwrap()
                .render(),
            "2"
        );
        assert_eq!(
            call("indexOf", &["hello".into(), "zz".into()])
                .unwrap()
                .render(),
            "-1"
        );
    }

    #[test]
    fn split_and_join_round_trip() {
        let parts = call("split", &["a,b,c".into(), ",".into()]).unwrap();
        assert_eq!(parts.render(), "[a, b, c]");
        let joined = call("join", &[parts, "-".into()]).unwrap();
        assert_eq!(joined.render(), "a-b-c");
    }

    #[test]
    fn to_number_parses_strings() {
        assert_eq!(call("toNumber", &["12.5".into()]).unwrap().render(), "12.5");
        assert!(call("toNumber", &["nope".into()]).is_err());
        assert!(call("toNumber", &[Value::Bool(true)]).is_err());
    }

    #[test]
    fn math_edge_cases_error() {
        assert!(call("sqrt", &[Value::Number(-1.0)]).is_err());
        assert!(call("log", &[Value::Number(0.0)]).is_err());
        assert_eq!(
            call("min", &[3.0.into(), 1.0.into(), 2.0.into()])
                .unwrap()
                .render(),
            "1"
        );
    }

    #[test]
    fn json_round_trip() {
        let parsed = call("jsonParse", &[r#"{"a": 1, "b": [true, null]}"#.into()]).unwrap();
        match &parsed {
            Value::Object(pairs) => {
                assert!(matches!(pairs.borrow().get("a"), Some(Value::Number(n)) if *n == 1.0));
            }
            other => panic!("expected object, got {other:?}"),
        }
        let back = call("jsonStringify", &[parsed]).unwrap();
        assert!(back.render().contains("\"a\":1"), "{back}");
    }

    #[test]
    fn json_stringify_rejects_functions() {
        let stringify = Registry::new().lookup("jsonStringify").unwrap();
        let sort = Registry::new().lookup("sort").unwrap();
        assert!(stringify.call(&[Value::Native(sort)]).is_err());
    }

    #[test]
    fn sort_and_sort_by() {
        let sorted = call(
            "sort",
            &[Value::array(vec![3.0.into(), 1.0.into(), 2.0.into()])],
        )
        .unwrap();
        assert_eq!(sorted.render(), "[1, 2, 3]");

        let desc = call(
            "sort",
            &[
                Value::array(vec![3.0.into(), 1.0.into(), 2.0.into()]),
                "desc".into(),
            ],
        )
        .unwrap();
        assert_eq!(desc.render(), "[3, 2, 1]");
    }

    #[test]
    fn sort_does_not_mutate_input() {
        let input = Value::array(vec![2.0.into(), 1.0.into()]);
        let _ = call("sort", std::slice::from_ref(&input)).unwrap();
        assert_eq!(input.render(), "[2, 1]");
    }

    #[test]
    fn slice_clamps_bounds() {
        let arr = Value::array(vec![1.0.into(), 2.0.into(), 3.0.into()]);
        assert_eq!(
            call("slice", &[arr.clone(), 1.0.into(), 99.0.into()])
                .unwrap()
                .render(),
            "[2, 3]"
        );
        assert_eq!(
            call("slice", &[arr, 5.0.into()]).unwrap().render(),
            "[]"
        );
    }

    #[test]
    fn first_and_last_of_empty_are_null() {
        let empty = Value::array(Vec::new());
        assert!(call("first", std::slice::from_ref(&empty)).unwrap().is_null());
        assert!(call("last", &[empty]).unwrap().is_null());
    }

    #[test]
    fn random_uuid_shape() {
        let uuid = call("randomUUID", &[]).unwrap().render();
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.matches('-').count(), 4);
        assert_eq!(&uuid[14..15], "4");
    }

    #[test]
    fn sha256_known_digest() {
        let digest = call("sha256", &["abc".into()]).unwrap().render();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
