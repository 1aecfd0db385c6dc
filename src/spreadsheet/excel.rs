//! Office Open XML package helpers
use crate::error::SweeperError;
use crate::helpers::xml::attribute;
use crate::helpers::xml::PartReader;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::ZipArchive;

pub(super) type ZipPartReader<'a, RS> = PartReader<BufReader<ZipFile<'a, RS>>>;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Opens a part of the package for reading, `None` when the package lacks it.
///
/// Producers disagree on the case of part names and some write `\` as separator,
/// so an exact match is tried first and a case-insensitive one after.
pub(super) fn open_part<'a, RS: Read + Seek>(
    zip: &'a mut ZipArchive<RS>,
    path: &str,
) -> Result<Option<ZipPartReader<'a, RS>>, SweeperError> {
    let wanted = path.replace('\\', "/");
    let name = if zip.index_for_name(&wanted).is_some() {
        wanted
    } else {
        match zip.file_names().find(|name| name.eq_ignore_ascii_case(&wanted)) {
            Some(name) => name.to_owned(),
            None => return Ok(None),
        }
    };
    let file = zip.by_name(&name)?;
    Ok(Some(PartReader::new(BufReader::new(file))))
}

/// Opens a part the workbook cannot do without.
pub(super) fn require_part<'a, RS: Read + Seek>(
    zip: &'a mut ZipArchive<RS>,
    path: &str,
) -> Result<ZipPartReader<'a, RS>, SweeperError> {
    match open_part(zip, path)? {
        Some(reader) => Ok(reader),
        None => Err(SpreadsheetError::FileError(path.to_owned()).into()),
    }
}

/// Loads worksheet relationships of a workbook
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
pub(super) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<String, String>, SweeperError> {
    let mut reader = require_part(zip, path)?;
    let mut relationships = HashMap::new();
    while let Some(event) = reader.next()? {
        let Event::Start(tag) = event else {
            continue;
        };
        if tag.local_name().as_ref() != TAG_RELATIONSHIP {
            continue;
        }
        // Chart sheets and dialog sheets hold no cells
        let is_worksheet = attribute(&tag, "Type")?
            .map(|kind| kind.ends_with("/worksheet"))
            .unwrap_or(true);
        if let (true, Some(id), Some(target)) = (is_worksheet, attribute(&tag, "Id")?, attribute(&tag, "Target")?) {
            relationships.insert(id, to_zip_path(&target));
        }
    }
    Ok(relationships)
}

/// Maps cell style indexes to cell types using custom and built-in number formats
///
/// # Arguments
/// * `format_indexes` - Number format id of every cell style, in style order
/// * `custom_formats` - Custom format mappings defined in the workbook
/// * `is_1904` - Whether the workbook uses the 1904 date system
pub(super) fn load_number_formats(
    format_indexes: Vec<String>,
    custom_formats: HashMap<String, CellType>,
    is_1904: bool,
) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the package
pub(super) fn to_zip_path(path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn maps_style_indexes() {
        let custom = HashMap::from([("164".to_string(), CellType::NumberDate1900)]);
        let formats = load_number_formats(vec!["0".into(), "164".into(), "22".into()], custom, true);
        assert_eq!(formats, vec![CellType::Number, CellType::NumberDate1900, CellType::NumberDateTime1904]);
    }

    #[test]
    fn keeps_worksheet_relationships_only() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/_rels/workbook.xml.rels", SimpleFileOptions::default()).unwrap();
        writer.write_all(br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
            <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
        </Relationships>"#).unwrap();
        let mut zip = ZipArchive::new(writer.finish().unwrap()).unwrap();

        let relationships = load_relationships(&mut zip, "xl/_rels/workbook.xml.rels").unwrap();
        assert_eq!(relationships, HashMap::from([("rId1".to_string(), "xl/worksheets/sheet1.xml".to_string())]));
        assert!(load_relationships(&mut zip, "xl/_rels/missing.rels").is_err());
    }

    #[test]
    fn opens_parts_ignoring_case_and_separator() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/workbook.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<workbook/>").unwrap();
        let mut zip = ZipArchive::new(writer.finish().unwrap()).unwrap();

        assert!(open_part(&mut zip, "xl/workbook.xml").unwrap().is_some());
        assert!(open_part(&mut zip, "XL\\Workbook.xml").unwrap().is_some());
        assert!(open_part(&mut zip, "xl/styles.xml").unwrap().is_none());
        let error = require_part(&mut zip, "xl/sharedStrings.xml").err().unwrap();
        assert_eq!(error.to_string(), "Missing workbook part 'xl/sharedStrings.xml'");
    }
}
