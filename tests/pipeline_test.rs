use chrono::{NaiveDate, NaiveDateTime};
use iqc_report::reports::aggregate;
use iqc_report::types::{CanonicalRecord, Cell, RawRow, TimeFilter};
use iqc_report::{process_iqc_data, recalculate, IqcError};

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn purchase_row(date: Cell, supplier: &str, result: &str, action: &str) -> RawRow {
    let mut row = vec![Cell::Empty; 20];
    row[2] = Cell::from(supplier);
    row[6] = date;
    row[18] = Cell::from(result);
    row[19] = Cell::from(action);
    row
}

fn with_preamble(rows: Vec<RawRow>) -> Vec<RawRow> {
    let mut sheet = vec![
        vec![Cell::from("IQC 来料检验记录")],
        vec![Cell::from("2025")],
        vec![Cell::from("序号")],
    ];
    sheet.extend(rows);
    sheet
}

fn scenario_sheet() -> Vec<RawRow> {
    with_preamble(vec![
        purchase_row(Cell::from("2025-01-05"), "A", "OK", "正常入库"),
        purchase_row(Cell::from("2025-01-20"), "A", "NG", "退货"),
        purchase_row(Cell::from("2025-02-01"), "B", "OK", "正常入库"),
    ])
}

fn mixed_records() -> Vec<CanonicalRecord> {
    let rows = [
        ("2025-01-03", "OK", "正常入库", "甲"),
        ("2025-01-09", "不合格", "退货", "甲"),
        ("2025-01-10", "NG", "特采", "乙"),
        ("2025-02-11", "待定", "生产领用", "乙"),
        ("2025-02-14", "", "", "丙"),
        ("2025-03-01", "OK", "PASS", "丙"),
        ("2025-03-02", "NG 外观", "RETURN", "丁"),
    ];
    let sheet = with_preamble(
        rows.iter()
            .map(|(d, r, a, s)| purchase_row(Cell::from(*d), s, r, a))
            .collect(),
    );
    process_iqc_data(&sheet, None, None, None, at(2025, 3, 5))
        .unwrap()
        .raw_data
}

#[test]
fn concrete_scenario() {
    let report = process_iqc_data(&scenario_sheet(), None, None, Some("2025.xlsx"), at(2025, 2, 5)).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(
        json["summary"],
        serde_json::json!({
            "totalBatches": 3,
            "okBatches": 2,
            "ngBatches": 1,
            // Both "正常入库" records count as passed.
            "passBatches": 2,
            "returnBatches": 1,
            "specialBatches": 0,
            "overallPassRate": 66.67
        })
    );
    assert_eq!(
        json["monthlyData"]["2025-01"],
        serde_json::json!({"total": 2, "ok": 1, "ng": 1, "pass": 1, "return": 1, "special": 0})
    );
    assert_eq!(
        json["supplierRanking"],
        serde_json::json!([
            {"rank": 1, "supplier": "B", "total": 1, "okCount": 1, "yieldRate": 100.0},
            {"rank": 2, "supplier": "A", "total": 2, "okCount": 1, "yieldRate": 50.0}
        ])
    );
    assert_eq!(json["rawData"].as_array().unwrap().len(), 3);
    assert_eq!(json["fileName"], "2025.xlsx");
}

#[test]
fn rates_stay_within_bounds() {
    let stats = aggregate(&mixed_records(), at(2025, 3, 5));
    let in_bounds = |r: f64| (0.0..=100.0).contains(&r);
    assert!(in_bounds(stats.summary.overall_pass_rate));
    assert!(stats.monthly_trend.iter().all(|m| in_bounds(m.pass_rate)));
    assert!(stats.supplier_ranking.iter().all(|s| in_bounds(s.yield_rate)));
}

#[test]
fn judgements_never_exceed_the_batch_count() {
    let stats = aggregate(&mixed_records(), at(2025, 3, 5));
    let s = &stats.summary;
    assert_eq!(s.total_batches, 7);
    assert!(s.ok_batches + s.ng_batches <= s.total_batches);
    // "待定" and the blank result match neither keyword set.
    assert!(s.ok_batches + s.ng_batches < s.total_batches);
    for bucket in stats.monthly_data.values() {
        assert!(bucket.ok + bucket.ng <= bucket.total);
        assert!(bucket.pass + bucket.returned + bucket.special <= bucket.total);
    }
}

#[test]
fn ranking_is_sorted_and_densely_numbered() {
    let stats = aggregate(&mixed_records(), at(2025, 3, 5));
    let ranking = &stats.supplier_ranking;
    assert_eq!(ranking.len(), 4);
    assert!(ranking.windows(2).all(|w| w[0].yield_rate >= w[1].yield_rate));
    let ranks: Vec<usize> = ranking.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

#[test]
fn unparseable_dates_are_dropped_everywhere() {
    let mut rows = scenario_sheet();
    rows.push(purchase_row(Cell::from("not-a-date"), "C", "OK", "正常入库"));
    let report = process_iqc_data(&rows, None, None, None, at(2025, 2, 5)).unwrap();
    assert_eq!(report.statistics.summary.total_batches, 3);
    assert!(report.raw_data.iter().all(|r| r.supplier != "C"));
    assert!(report
        .statistics
        .supplier_ranking
        .iter()
        .all(|r| r.supplier != "C"));
}

#[test]
fn serial_dates_are_read_like_text_dates() {
    // 45000 is 2023-03-14 in the 1900 date system.
    let sheet = with_preamble(vec![
        purchase_row(Cell::Number(45000.0), "A", "OK", "正常入库"),
        purchase_row(Cell::from("2023/03/14"), "A", "OK", "正常入库"),
        purchase_row(Cell::Number(20230314.0), "A", "OK", "正常入库"),
    ]);
    let report = process_iqc_data(&sheet, None, None, None, at(2023, 3, 15)).unwrap();
    assert_eq!(report.raw_data.len(), 3);
    assert!(report
        .raw_data
        .iter()
        .all(|r| r.date() == NaiveDate::from_ymd_opt(2023, 3, 14).unwrap()));
    assert_eq!(report.statistics.monthly_data["2023-03"].total, 3);
}

#[test]
fn wednesday_week_window() {
    // 2025-10-29 is a Wednesday.
    let records = vec![
        CanonicalRecord {
            time: at(2025, 10, 24),
            result: "OK".into(),
            action: "正常入库".into(),
            supplier: "A".into(),
            appearance_rate: String::new(),
            defect_detail: String::new(),
            appearance_defect: String::new(),
            dimension_defect: String::new(),
            performance_defect: String::new(),
        },
        CanonicalRecord {
            time: at(2025, 10, 23),
            result: "NG".into(),
            action: "退货".into(),
            supplier: "A".into(),
            appearance_rate: String::new(),
            defect_detail: String::new(),
            appearance_defect: String::new(),
            dimension_defect: String::new(),
            performance_defect: String::new(),
        },
    ];
    let now = NaiveDate::from_ymd_opt(2025, 10, 29)
        .unwrap()
        .and_hms_opt(15, 45, 0)
        .unwrap();
    let weeks = aggregate(&records, now).recent_two_weeks;
    assert_eq!(weeks.current_week_start, "2025-10-24");
    assert_eq!(weeks.current_week_end, "2025-10-30");
    assert_eq!(weeks.previous_week_start, "2025-10-17");
    assert_eq!(weeks.previous_week_end, "2025-10-23");
    assert_eq!(weeks.current_week.total, 1);
    assert_eq!(weeks.current_week.ok, 1);
    assert_eq!(weeks.previous_week.total, 1);
    assert_eq!(weeks.previous_week.returned, 1);
}

#[test]
fn appearance_rate_fraction_and_percent_converge() {
    let mut fraction = purchase_row(Cell::from("2025-01-05"), "A", "OK", "正常入库");
    fraction[11] = Cell::Number(0.953);
    let mut percent = purchase_row(Cell::from("2025-01-06"), "A", "OK", "正常入库");
    percent[11] = Cell::Number(95.3);
    let report = process_iqc_data(&with_preamble(vec![fraction, percent]), None, None, None, at(2025, 1, 8)).unwrap();
    let rates: Vec<&str> = report
        .raw_data
        .iter()
        .map(|r| r.appearance_rate.as_str())
        .collect();
    assert_eq!(rates, vec!["95.30", "95.30"]);
}

#[test]
fn external_header_shifts_the_columns() {
    let mut header = vec![Cell::Empty; 19];
    header[17] = Cell::from("最终判定");
    header[18] = Cell::from("处理方式");
    let mut row = vec![Cell::Empty; 19];
    row[2] = Cell::from("外协厂");
    row[6] = Cell::from("2025-04-02");
    row[10] = Cell::Number(0.99);
    row[14] = Cell::from("尺寸超差");
    row[17] = Cell::from("NG");
    row[18] = Cell::from("退货");
    let sheet = vec![vec![Cell::from("外协检验")], vec![], header, row];

    let report = process_iqc_data(&sheet, None, None, None, at(2025, 4, 3)).unwrap();
    let record = &report.raw_data[0];
    assert_eq!(record.result, "NG");
    assert_eq!(record.action, "退货");
    assert_eq!(record.appearance_rate, "99.00");
    assert_eq!(record.dimension_defect, "尺寸超差");
    assert_eq!(report.statistics.summary.return_batches, 1);
}

#[test]
fn filters_apply_on_load_and_on_recalculation() {
    let sheet = scenario_sheet();
    let feb = TimeFilter::parse("month", "2025-02").unwrap();
    let direct = process_iqc_data(&sheet, None, feb, None, at(2025, 2, 5)).unwrap();
    assert_eq!(direct.statistics.summary.total_batches, 1);
    assert_eq!(direct.raw_data.len(), 1);

    let full = process_iqc_data(&sheet, None, None, None, at(2025, 2, 5)).unwrap();
    let by_supplier = recalculate(&full.raw_data, Some("A"), None, at(2025, 2, 5));
    assert_eq!(by_supplier.summary.total_batches, 2);
    assert_eq!(by_supplier.supplier_filter.as_deref(), Some("A"));

    let none = recalculate(&full.raw_data, Some("Z"), None, at(2025, 2, 5));
    assert_eq!(none.summary.total_batches, 0);
    assert_eq!(none.summary.overall_pass_rate, 0.0);
    assert!(none.supplier_ranking.is_empty());
}

#[test]
fn aggregation_is_repeatable() {
    let records = mixed_records();
    let a = serde_json::to_string(&aggregate(&records, at(2025, 3, 5))).unwrap();
    let b = serde_json::to_string(&aggregate(&records, at(2025, 3, 5))).unwrap();
    assert_eq!(a, b);
}

#[test]
fn sheet_without_dates_is_rejected() {
    let sheet = vec![vec![Cell::from("title")], vec![], vec![Cell::from("header")]];
    let err = process_iqc_data(&sheet, None, None, None, at(2025, 1, 1)).unwrap_err();
    assert!(matches!(err, IqcError::Processing(ref inner) if matches!(**inner, IqcError::MissingRequiredColumns)));
}
