use std::io::{Cursor, Write};

use anyhow::{anyhow, Result};
use enum_dispatch::enum_dispatch;
use geo::geometry::Geometry;
use geojson::JsonObject;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wkt::TryFromWkt;

use crate::COL;

/// Utility function to convert from polars `AnyValue` to `serde_json::Value`.
/// Covers the types the dashboard frames contain.
fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::StringOwned(s) => Ok(Value::String(s.to_string())),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float32(n) => Ok(json!(*n)),
        AnyValue::Float64(n) => Ok(json!(*n)),
        _ => Err(anyhow!("Failed to convert type")),
    }
}

/// Builds one GeoJSON feature per row with a WKT `geometry`; every other column becomes a
/// property. Rows without geometry are skipped.
fn features(df: &DataFrame) -> Result<Vec<geojson::Feature>> {
    let geometry_col = df.column(COL::GEOMETRY)?;
    let other_cols = df.drop(COL::GEOMETRY)?;
    let mut features = vec![];
    for (idx, geom) in geometry_col.str()?.into_iter().enumerate() {
        if let Some(wkt_str) = geom {
            let geom: Geometry<f64> = Geometry::try_from_wkt_str(wkt_str).map_err(|err| {
                anyhow!("Invalid `Geometry<f64>` from well-known text string: {err}")
            })?;
            let mut properties = serde_json::Map::new();
            for col in other_cols.get_columns() {
                let val = any_value_to_json(&col.get(idx)?)?;
                properties.insert(col.name().to_string(), val);
            }
            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::from(&geom)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
    }
    Ok(features)
}

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// `DataFrame` and save which writes the same output to a writer
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        // Just creating an empty vec to store the buffered output
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, df)?;

        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    GeoJSON(GeoJSONFormatter),
    GeoJSONSeq(GeoJSONSeqFormatter),
    Csv(CSVFormatter),
}

/// Format the results as geojson sequence format
/// This is one line per feature serialized as a
/// geojson feature
#[derive(Serialize, Deserialize, Debug)]
pub struct GeoJSONSeqFormatter;

impl OutputGenerator for GeoJSONSeqFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        for feature in features(df)? {
            writeln!(writer, "{feature}")?;
        }
        Ok(())
    }
}

/// Format the results as a CSV file with the geometry as WKT
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer).finish(df)?;
        Ok(())
    }
}

/// Format the results as a geojson feature collection. `foreign_members` are written at the top
/// level of the collection, next to `features`.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GeoJSONFormatter {
    pub foreign_members: Option<JsonObject>,
}

impl OutputGenerator for GeoJSONFormatter {
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let feature_collection = geojson::FeatureCollection {
            bbox: None,
            features: features(df)?,
            foreign_members: self.foreign_members.clone(),
        };
        Ok(feature_collection.to_string())
    }

    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let result = self.format(df)?;
        writer.write_all(result.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df() -> DataFrame {
        df!(
             "int_val" => &[2, 3, 4],
             "float_val" => &[2.0, 3.0, 4.0],
             "str_val" => &["two", "three", "four"],
             "geometry" => &["POINT (0 0)", "POINT (20 20)", "POINT (30 44)"]
        )
        .unwrap()
    }

    #[test]
    fn geojson_formatter_should_work() {
        let formatter = GeoJSONFormatter::default();
        let mut df = test_df();
        let output = formatter.format(&mut df);
        assert!(output.is_ok(), "Output should not error");
        let value: Value = serde_json::from_str(&output.unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[1]["geometry"]["coordinates"], json!([20.0, 20.0]));
        assert_eq!(features[1]["properties"]["str_val"], "three");
        assert_eq!(features[1]["properties"]["int_val"], 3);
        assert!(features[1]["properties"].get("geometry").is_none());
    }

    #[test]
    fn geojson_formatter_writes_foreign_members() {
        let mut members = JsonObject::new();
        members.insert("title".into(), json!("NO₂ Change Map (2018 - 2024)"));
        let formatter = GeoJSONFormatter {
            foreign_members: Some(members),
        };
        let output = formatter.format(&mut test_df()).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["title"], "NO₂ Change Map (2018 - 2024)");
    }

    #[test]
    fn geojsonseq_formatter_should_work() {
        let formatter = GeoJSONSeqFormatter;
        let mut df = test_df();
        let output = formatter.format(&mut df);
        assert!(output.is_ok(), "Output should not error");
        let output = output.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["type"], "Feature");
        }
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn csv_formatter_should_work() {
        let formatter = CSVFormatter;
        let mut df = test_df();
        let output = formatter.format(&mut df);
        let correct_str = [
            "int_val,float_val,str_val,geometry",
            "2,2.0,two,POINT (0 0)",
            "3,3.0,three,POINT (20 20)",
            "4,4.0,four,POINT (30 44)",
            "",
        ]
        .join("\n");

        assert!(output.is_ok(), "Output should not error");
        assert_eq!(output.unwrap(), correct_str, "Output should be correct");
    }

    #[test]
    fn invalid_wkt_is_an_error() {
        let mut df = df!("NAME" => &["Chad"], "geometry" => &["POLYGON ((0 0"]).unwrap();
        assert!(GeoJSONFormatter::default().format(&mut df).is_err());
    }
}
