//! CSV export of trajectories and import of input tables.
//!
//! The header row holds quoted names starting with `"time"`. Booleans are
//! written as 0/1 and strings are quoted with doubled inner quotes.

use crate::{ResultsError, ResultsResult};
use co_model::ScalarValue;
use co_sim::{InputTable, Trajectory};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn format_value(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Boolean(b) => u8::from(*b).to_string(),
        ScalarValue::String(s) => quote(s),
        other => other.to_string(),
    }
}

pub fn write_trajectory_csv<W: Write>(trajectory: &Trajectory, mut writer: W) -> ResultsResult<()> {
    let header: Vec<String> = std::iter::once("time")
        .chain(trajectory.names.iter().map(String::as_str))
        .map(quote)
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    for i in 0..trajectory.len() {
        let mut line = trajectory.time[i].to_string();
        for column in &trajectory.columns {
            line.push(',');
            if let Some(value) = column.get(i) {
                line.push_str(&format_value(&value));
            }
        }
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_trajectory_csv_file(trajectory: &Trajectory, path: &Path) -> ResultsResult<()> {
    let file = File::create(path)?;
    write_trajectory_csv(trajectory, BufWriter::new(file))
}

fn unquote(field: &str) -> String {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .map(|f| f.replace("\"\"", "\""))
        .unwrap_or_else(|| field.to_string())
}

/// Read an input table: first column time, remaining columns numeric.
///
/// Blank lines and lines starting with `#` are skipped. Boolean columns may
/// use `true`/`false`.
pub fn read_input_csv<R: BufRead>(reader: R) -> ResultsResult<InputTable> {
    let mut names: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();

        let Some(header) = &names else {
            let header: Vec<String> = fields.iter().map(|f| unquote(f)).collect();
            if header.len() < 2 {
                return Err(ResultsError::Csv {
                    line: number,
                    message: "expected a time column and at least one signal".to_string(),
                });
            }
            names = Some(header[1..].to_vec());
            continue;
        };

        if fields.len() != header.len() + 1 {
            return Err(ResultsError::Csv {
                line: number,
                message: format!("expected {} fields, found {}", header.len() + 1, fields.len()),
            });
        }
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            values.push(parse_number(field).ok_or_else(|| ResultsError::Csv {
                line: number,
                message: format!("not a number: {}", field.trim()),
            })?);
        }
        rows.push((values[0], values[1..].to_vec()));
    }

    let Some(names) = names else {
        return Err(ResultsError::Csv {
            line: 0,
            message: "missing header".to_string(),
        });
    };
    Ok(InputTable::from_rows(names, &rows)?)
}

pub fn read_input_csv_file(path: &Path) -> ResultsResult<InputTable> {
    let file = File::open(path)?;
    read_input_csv(BufReader::new(file))
}

fn parse_number(field: &str) -> Option<f64> {
    match unquote(field).as_str() {
        "true" => Some(1.0),
        "false" => Some(0.0),
        text => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use co_model::{ValueBuffer, VariableType};

    fn trajectory() -> Trajectory {
        let mut trajectory = Trajectory::new(
            vec!["x".into(), "on".into(), "n".into()],
            vec![VariableType::Float64, VariableType::Boolean, VariableType::Int32],
        );
        trajectory.time = vec![0.0, 0.5];
        trajectory.columns = vec![
            ValueBuffer::Float64(vec![1.0, 0.25]),
            ValueBuffer::Boolean(vec![false, true]),
            ValueBuffer::Int32(vec![3, -4]),
        ];
        trajectory
    }

    #[test]
    fn writes_header_and_rows() {
        let mut out = Vec::new();
        write_trajectory_csv(&trajectory(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "\"time\",\"x\",\"on\",\"n\"\n0,1,0,3\n0.5,0.25,1,-4\n");
    }

    #[test]
    fn reads_input_table() {
        let text = "\"time\",\"u\",\"k\"\n# comment\n0,0.0,1\n1,2.5,true\n\n2,5,false\n";
        let table = read_input_csv(text.as_bytes()).unwrap();
        assert_eq!(table.names(), ["u", "k"]);
        assert_eq!(table.time(), [0.0, 1.0, 2.0]);
        assert_eq!(table.column("u").unwrap(), [0.0, 2.5, 5.0]);
        assert_eq!(table.column("k").unwrap(), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn written_trajectory_reads_back_as_input() {
        let mut out = Vec::new();
        write_trajectory_csv(&trajectory(), &mut out).unwrap();
        let table = read_input_csv(out.as_slice()).unwrap();
        assert_eq!(table.column("n").unwrap(), [3.0, -4.0]);
    }

    #[test]
    fn rejects_bad_rows() {
        let short = "time,u\n0\n";
        assert!(matches!(
            read_input_csv(short.as_bytes()),
            Err(ResultsError::Csv { line: 2, .. })
        ));

        let text = "time,u\n0,abc\n";
        assert!(matches!(
            read_input_csv(text.as_bytes()),
            Err(ResultsError::Csv { line: 2, .. })
        ));

        let decreasing = "time,u\n1,0\n0,1\n";
        assert!(matches!(
            read_input_csv(decreasing.as_bytes()),
            Err(ResultsError::Sim(_))
        ));

        assert!(read_input_csv("".as_bytes()).is_err());
    }
}
