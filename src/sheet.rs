use anyhow::{anyhow, Context};
use calamine::{open_workbook_auto, Data, Reader};
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// An uploaded roster sheet: the declared header row plus one map per
/// data row. A cell that is empty or absent does not appear in its
/// row's map, so callers can tell "missing" from "present but blank".
#[derive(Debug, Clone)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

fn cell_to_string(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        // Spreadsheet tools often type id columns as numbers; render
        // whole floats without the trailing ".0".
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => return Some(format!("{:?}", e)),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Reads the first worksheet of an .xlsx/.xls file. The first row is
/// taken as the header row; every other row becomes a header→value map.
pub fn read_sheet(path: &Path) -> anyhow::Result<SheetData> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open spreadsheet {}", path.to_string_lossy()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("spreadsheet has no worksheets"))?
        .context("failed to read first worksheet")?;

    let mut row_iter = range.rows();
    let Some(header_row) = row_iter.next() else {
        return Ok(SheetData {
            headers: Vec::new(),
            rows: Vec::new(),
        });
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| cell_to_string(c).unwrap_or_default())
        .collect();

    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for raw in row_iter {
        let mut row: HashMap<String, String> = HashMap::new();
        for (i, cell) in raw.iter().enumerate() {
            let Some(header) = headers.get(i) else {
                break;
            };
            if header.is_empty() {
                continue;
            }
            if let Some(value) = cell_to_string(cell) {
                row.insert(header.clone(), value);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(SheetData { headers, rows })
}

fn column_ref(index: usize) -> String {
    // 0 -> A, 25 -> Z, 26 -> AA.
    let mut n = index + 1;
    let mut s = String::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        s.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    s
}

fn push_row(xml: &mut String, row_number: usize, cells: &[String]) {
    xml.push_str(&format!("<row r=\"{}\">", row_number));
    for (i, value) in cells.iter().enumerate() {
        xml.push_str(&format!(
            "<c r=\"{}{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            column_ref(i),
            row_number,
            escape(value.as_str())
        ));
    }
    xml.push_str("</row>");
}

/// Writes a minimal single-sheet .xlsx: one header row, then the data
/// rows, all cells as inline strings. An empty `rows` slice still
/// produces the header row.
pub fn write_sheet(
    path: &Path,
    sheet_name: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.to_string_lossy()))?;
    let mut zip = ZipWriter::new(out);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let content_types = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
        "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        "<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
        "<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
        "</Types>"
    );
    zip.start_file("[Content_Types].xml", opts)
        .context("failed to start content types entry")?;
    zip.write_all(content_types.as_bytes())
        .context("failed to write content types entry")?;

    let rels = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>",
        "</Relationships>"
    );
    zip.start_file("_rels/.rels", opts)
        .context("failed to start package rels entry")?;
    zip.write_all(rels.as_bytes())
        .context("failed to write package rels entry")?;

    let workbook = format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
            "<sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets>",
            "</workbook>"
        ),
        escape(sheet_name)
    );
    zip.start_file("xl/workbook.xml", opts)
        .context("failed to start workbook entry")?;
    zip.write_all(workbook.as_bytes())
        .context("failed to write workbook entry")?;

    let workbook_rels = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>",
        "</Relationships>"
    );
    zip.start_file("xl/_rels/workbook.xml.rels", opts)
        .context("failed to start workbook rels entry")?;
    zip.write_all(workbook_rels.as_bytes())
        .context("failed to write workbook rels entry")?;

    let mut sheet_xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
        "<sheetData>"
    ));
    push_row(&mut sheet_xml, 1, headers);
    for (i, row) in rows.iter().enumerate() {
        push_row(&mut sheet_xml, i + 2, row);
    }
    sheet_xml.push_str("</sheetData></worksheet>");

    zip.start_file("xl/worksheets/sheet1.xml", opts)
        .context("failed to start worksheet entry")?;
    zip.write_all(sheet_xml.as_bytes())
        .context("failed to write worksheet entry")?;

    zip.finish().context("failed to finalize xlsx")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_xlsx(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(name);
        (dir, path)
    }

    #[test]
    fn written_sheet_reads_back_with_headers() {
        let (_dir, path) = temp_xlsx("roundtrip.xlsx");
        let headers: Vec<String> = vec!["student_id".into(), "full_name".into(), "email".into()];
        let rows = vec![
            vec!["SV001".into(), "Nguyễn Văn An".into(), "".into()],
            vec!["SV002".into(), "Trần & Bình <test>".into(), "ttb@x.vn".into()],
        ];
        write_sheet(&path, "Sinh viên", &headers, &rows).expect("write sheet");

        let data = read_sheet(&path).expect("read sheet");
        assert_eq!(data.headers, headers);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0].get("student_id").map(String::as_str), Some("SV001"));
        // Blank cell is absent, not empty-string.
        assert!(!data.rows[0].contains_key("email"));
        // XML-special characters survive escaping.
        assert_eq!(
            data.rows[1].get("full_name").map(String::as_str),
            Some("Trần & Bình <test>")
        );
    }

    #[test]
    fn empty_row_set_still_writes_header_row() {
        let (_dir, path) = temp_xlsx("header_only.xlsx");
        let headers: Vec<String> = vec!["Mã SV".into(), "Họ tên".into()];
        write_sheet(&path, "Sinh viên", &headers, &[]).expect("write sheet");

        let data = read_sheet(&path).expect("read sheet");
        assert_eq!(data.headers, headers);
        assert!(data.rows.is_empty());
    }

    #[test]
    fn column_refs_roll_over_past_z() {
        assert_eq!(column_ref(0), "A");
        assert_eq!(column_ref(25), "Z");
        assert_eq!(column_ref(26), "AA");
        assert_eq!(column_ref(27), "AB");
    }
}
