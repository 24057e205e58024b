/// Download filename and MIME type surfaced with every roster export.
pub const EXPORT_FILE_NAME: &str = "danh_sach_sinh_vien.xlsx";
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const EXPORT_SHEET_NAME: &str = "Sinh viên";

/// Localized column labels, in the fixed export order.
pub const EXPORT_HEADERS: [&str; 7] = [
    "Mã SV",
    "Họ tên",
    "Email",
    "Điện thoại",
    "Lớp",
    "Chuyên ngành",
    "Trạng thái",
];

/// A student as read back from the store for export purposes.
#[derive(Debug, Clone)]
pub struct StudentRow {
    pub student_no: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub class_name: String,
    pub major: String,
    pub status: String,
}

/// Projects the full student set onto the export columns. No filtering;
/// an empty set yields no data rows (the writer still emits the header
/// row).
pub fn student_export_rows(students: &[StudentRow]) -> Vec<Vec<String>> {
    students
        .iter()
        .map(|s| {
            vec![
                s.student_no.clone(),
                s.full_name.clone(),
                s.email.clone(),
                s.phone.clone(),
                s.class_name.clone(),
                s.major.clone(),
                s.status.clone(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_projects_to_no_rows() {
        assert!(student_export_rows(&[]).is_empty());
    }

    #[test]
    fn columns_follow_header_order() {
        let students = vec![StudentRow {
            student_no: "SV001".to_string(),
            full_name: "Nguyễn Văn An".to_string(),
            email: "nva@student.edu.vn".to_string(),
            phone: "0901234567".to_string(),
            class_name: "CNTT-K17".to_string(),
            major: "Công nghệ thông tin".to_string(),
            status: "active".to_string(),
        }];
        let rows = student_export_rows(&students);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), EXPORT_HEADERS.len());
        assert_eq!(rows[0][0], "SV001");
        assert_eq!(rows[0][1], "Nguyễn Văn An");
        assert_eq!(rows[0][6], "active");
    }
}
