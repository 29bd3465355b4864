use serde_json::{Map, Value};
use std::io;

/// Row lists written as CSV in place of the field/value summary.
const ROW_KEYS: [&str; 2] = ["periods", "yearly"];

/// Write output as CSV to stdout.
///
/// Schedules and yearly comparisons become one row per period, sweeps one
/// row per grid point, anything else a two-column field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let target = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match target {
        Value::Object(result) => {
            if let Some(rows) = ROW_KEYS
                .iter()
                .find_map(|k| result.get(*k).and_then(Value::as_array))
            {
                write_array_csv(&mut wtr, rows);
            } else if result.contains_key("variable_values") {
                write_sweep_csv(&mut wtr, result);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                write_fields(&mut wtr, "", result);
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(target)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields(wtr: &mut csv::Writer<io::StdoutLock<'_>>, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => write_fields(wtr, &name, inner),
            _ => {
                let _ = wtr.write_record([name.as_str(), &format_csv_value(val)]);
            }
        }
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn write_sweep_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Map<String, Value>) {
    let empty = Vec::new();
    let name = |k: &str| result.get(k).map(format_csv_value).unwrap_or_default();
    let list = |k: &str| result.get(k).and_then(Value::as_array).unwrap_or(&empty);

    let v1_values = list("variable_values");
    let v2_values = list("second_variable_values");
    let grid = list("values");
    let metric = name("output_metric");

    if v2_values.is_empty() {
        let _ = wtr.write_record([name("variable_name"), metric]);
    } else {
        let _ = wtr.write_record([name("variable_name"), name("second_variable_name"), metric]);
    }

    for (v1, row) in v1_values.iter().zip(grid) {
        let cells = row.as_array().unwrap_or(&empty);
        if v2_values.is_empty() {
            let cell = cells.first().map(format_csv_value).unwrap_or_default();
            let _ = wtr.write_record([format_csv_value(v1), cell]);
        } else {
            for (v2, cell) in v2_values.iter().zip(cells) {
                let _ = wtr.write_record([
                    format_csv_value(v1),
                    format_csv_value(v2),
                    format_csv_value(cell),
                ]);
            }
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
