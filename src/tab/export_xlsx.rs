// Writes the statistics of a survey into an Excel workbook, one worksheet per question.

use rust_xlsxwriter::{
    Chart, ChartLegendPosition, ChartType, Color, Format, Workbook, Worksheet, XlsxError,
};

use crate::tab::*;

struct Formats {
    title: Format,
    header: Format,
    label: Format,
    percentage: Format,
}

impl Formats {
    fn new() -> Formats {
        Formats {
            title: Format::new().set_bold().set_font_size(14),
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0x4472C4))
                .set_font_color(Color::White),
            label: Format::new().set_bold(),
            percentage: Format::new().set_num_format("0.0%"),
        }
    }
}

/// The worksheet names of Excel are limited to 31 characters.
fn sheet_name(idx: usize) -> String {
    format!("Question {}", idx + 1)
}

pub fn write_statistics(path: &str, survey: &Survey, stats: &SurveyStatistics) -> TabResult<()> {
    info!("Writing the Excel export to {:?}", path);
    let mut workbook = Workbook::new();
    let formats = Formats::new();
    fill_workbook(&mut workbook, &formats, survey, stats).context(WritingExcelSnafu { path })?;
    workbook.save(path).context(WritingExcelSnafu { path })?;
    Ok(())
}

fn fill_workbook(
    workbook: &mut Workbook,
    formats: &Formats,
    survey: &Survey,
    stats: &SurveyStatistics,
) -> Result<(), XlsxError> {
    if stats.questions.is_empty() {
        let sheet = workbook.add_worksheet();
        write_heading(sheet, formats, stats)?;
        return Ok(());
    }
    for (idx, qs) in stats.questions.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        let name = sheet_name(idx);
        sheet.set_name(&name)?;
        write_heading(sheet, formats, stats)?;
        sheet.write_string_with_format(3, 0, "Question", &formats.label)?;
        sheet.write_string(3, 1, &qs.text)?;
        sheet.write_string_with_format(4, 0, "Answered by", &formats.label)?;
        sheet.write_number(4, 1, qs.total_answers as f64)?;

        let dense = match survey.question(qs.id) {
            Some(q) => qs.dense(q),
            None => qs.clone(),
        };
        match &dense.data {
            QuestionTally::Counts(counts) => {
                write_counts(sheet, formats, &dense, 6)?;
                if dense.total_answers > 0 && !counts.is_empty() {
                    insert_count_charts(sheet, &name, 7, 6 + counts.len() as u32)?;
                }
            }
            QuestionTally::Grid(rows) => {
                write_grid(sheet, formats, rows, 6)?;
                insert_grid_chart(sheet, &name, rows, 6)?;
            }
        };
    }
    Ok(())
}

fn write_heading(
    sheet: &mut Worksheet,
    formats: &Formats,
    stats: &SurveyStatistics,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(0, 0, &stats.survey.title, &formats.title)?;
    sheet.write_string_with_format(1, 0, "Total responses", &formats.label)?;
    sheet.write_number(1, 1, stats.survey.total_responses as f64)?;
    sheet.set_column_width(0, 40)?;
    sheet.set_column_width(1, 14)?;
    sheet.set_column_width(2, 14)?;
    Ok(())
}

fn write_counts(
    sheet: &mut Worksheet,
    formats: &Formats,
    qs: &QuestionStatistics,
    first_row: u32,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(first_row, 0, "Option", &formats.header)?;
    sheet.write_string_with_format(first_row, 1, "Count", &formats.header)?;
    sheet.write_string_with_format(first_row, 2, "Percentage", &formats.header)?;
    for (i, share) in qs.shares().iter().enumerate() {
        let row = first_row + 1 + i as u32;
        sheet.write_string(row, 0, &share.label)?;
        sheet.write_number(row, 1, share.count as f64)?;
        sheet.write_number_with_format(row, 2, share.percentage / 100.0, &formats.percentage)?;
    }
    sheet.set_freeze_panes(first_row + 1, 0)?;
    Ok(())
}

fn write_grid(
    sheet: &mut Worksheet,
    formats: &Formats,
    rows: &[(String, Vec<(String, u64)>)],
    first_row: u32,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(first_row, 0, "", &formats.header)?;
    let columns: Vec<&String> = rows
        .first()
        .map(|(_, cols)| cols.iter().map(|(c, _)| c).collect())
        .unwrap_or_default();
    for (j, col) in columns.iter().enumerate() {
        sheet.write_string_with_format(first_row, 1 + j as u16, col.as_str(), &formats.header)?;
        sheet.set_column_width(1 + j as u16, 14)?;
    }
    for (i, (row_label, cols)) in rows.iter().enumerate() {
        let row = first_row + 1 + i as u32;
        sheet.write_string_with_format(row, 0, row_label, &formats.label)?;
        for (j, (_, count)) in cols.iter().enumerate() {
            sheet.write_number(row, 1 + j as u16, *count as f64)?;
        }
    }
    sheet.set_freeze_panes(first_row + 1, 1)?;
    Ok(())
}

/// A pie chart and a column chart over the label and count columns, right of the table.
fn insert_count_charts(
    sheet: &mut Worksheet,
    name: &str,
    first_row: u32,
    last_row: u32,
) -> Result<(), XlsxError> {
    let mut pie = Chart::new(ChartType::Pie);
    pie.title().set_name(name);
    pie.add_series()
        .set_categories((name, first_row, 0, last_row, 0))
        .set_values((name, first_row, 1, last_row, 1));
    pie.legend().set_position(ChartLegendPosition::Right);
    sheet.insert_chart(first_row, 4, &pie)?;

    let mut column = Chart::new(ChartType::Column);
    column.title().set_name(name);
    column.add_series()
        .set_categories((name, first_row, 0, last_row, 0))
        .set_values((name, first_row, 1, last_row, 1));
    column.x_axis().set_name("Option");
    column.y_axis().set_name("Count");
    column.legend().set_hidden();
    sheet.insert_chart(first_row + 16, 4, &column)?;
    Ok(())
}

/// Grouped columns: one series per grid column, the rows as categories.
fn insert_grid_chart(
    sheet: &mut Worksheet,
    name: &str,
    rows: &[(String, Vec<(String, u64)>)],
    header_row: u32,
) -> Result<(), XlsxError> {
    let width = rows.first().map(|(_, cols)| cols.len()).unwrap_or(0);
    if rows.is_empty() || width == 0 {
        return Ok(());
    }
    let first_row = header_row + 1;
    let last_row = header_row + rows.len() as u32;
    let mut chart = Chart::new(ChartType::Column);
    chart.title().set_name(name);
    for j in 0..width {
        let col = 1 + j as u16;
        chart
            .add_series()
            .set_name((name, header_row, col))
            .set_categories((name, first_row, 0, last_row, 0))
            .set_values((name, first_row, col, last_row, col));
    }
    chart.x_axis().set_name("Row");
    chart.y_axis().set_name("Count");
    chart.legend().set_position(ChartLegendPosition::Right);
    sheet.insert_chart(first_row, 2 + width as u16, &chart)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn export_to_file() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let mut b = SurveyBuilder::new("s1", "Lunch", start, end).unwrap();
        b.add_single("Main course", &["Fish", "Pasta"], true).unwrap();
        b.add_matrix("Rate the service", &["Speed"], &["Bad", "Good"], false)
            .unwrap();
        let survey = b.build().unwrap();
        let stats = compute_statistics(&survey, &[]);

        let path = std::env::temp_dir().join("surveytab_export_test.xlsx");
        let path_s = path.display().to_string();
        write_statistics(&path_s, &survey, &stats).unwrap();
        assert!(path.exists());
        _ = std::fs::remove_file(&path);
    }

    #[test]
    fn export_answered_questions_with_charts() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let mut b = SurveyBuilder::new("s1", "Lunch", start, end).unwrap();
        let main = b.add_single("Main course", &["Fish", "Pasta"], true).unwrap();
        let service = b
            .add_matrix("Rate the service", &["Speed", "Taste"], &["Bad", "Good"], false)
            .unwrap();
        let survey = b.build().unwrap();
        let fish = survey.question(main).unwrap().kind.options()[0].id;
        let (speed, good) = match &survey.question(service).unwrap().kind {
            QuestionKind::Matrix(grid) => (grid.rows[0].id, grid.columns[1].id),
            _ => unreachable!(),
        };
        let response = Response::from_records(
            survey.id().clone(),
            Respondent::default(),
            None,
            vec![
                AnswerRecord {
                    question_id: main,
                    value: AnswerValue::Selected(fish),
                },
                AnswerRecord {
                    question_id: service,
                    value: AnswerValue::Cell(speed, good),
                },
            ],
        );
        let stats = compute_statistics(&survey, &[response]);
        assert_eq!(stats.questions[0].total_answers, 1);

        let path = std::env::temp_dir().join("surveytab_export_charts_test.xlsx");
        let path_s = path.display().to_string();
        write_statistics(&path_s, &survey, &stats).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        _ = std::fs::remove_file(&path);
    }
}
