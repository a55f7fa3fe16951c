//! Integration tests for rfmforge

use rfmforge::{
    build_rfm, cluster, fit_kmeans, load_transactions, run_segmentation, standardize, summarize,
    CustomerId, KMeansParams, SegmentError,
};
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country"
    )
    .unwrap();

    // Customer 17850 - repeat buyer
    writeln!(file, "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01 08:26:00,2.55,17850,United Kingdom").unwrap();
    writeln!(file, "536365,71053,WHITE METAL LANTERN,6,2010-12-01 08:26:00,3.39,17850,United Kingdom").unwrap();
    writeln!(file, "536366,22633,HAND WARMER UNION JACK,6,2011-11-01 08:28:00,1.85,17850,United Kingdom").unwrap();
    writeln!(file, "536370,22728,ALARM CLOCK BAKELIKE PINK,24,2011-11-20 08:45:00,3.75,17850,United Kingdom").unwrap();

    // Customer 13047 - single old purchase
    writeln!(file, "536367,84406B,CREAM CUPID HEARTS COAT HANGER,8,2010-12-01 08:34:00,2.75,13047,United Kingdom").unwrap();

    // Customer 12345 - recent high value
    writeln!(file, "536368,22752,SET 7 BABUSHKA NESTING BOXES,2,2011-12-05 10:15:00,7.65,12345,United Kingdom").unwrap();
    writeln!(file, "536368,21730,GLASS STAR FROSTED T-LIGHT HOLDER,12,2011-12-05 10:15:00,1.25,12345,United Kingdom").unwrap();
    writeln!(file, "536371,22632,HAND WARMER RED POLKA DOT,96,2011-12-08 12:00:00,1.85,12345,United Kingdom").unwrap();

    // Customer 98765 - old low value with a return
    writeln!(file, "536369,22457,NATURAL SLATE HEART CHALKBOARD,4,2010-01-15 09:00:00,3.25,98765,United Kingdom").unwrap();
    writeln!(file, "C536372,22457,NATURAL SLATE HEART CHALKBOARD,-4,2010-01-20 09:00:00,3.25,98765,United Kingdom").unwrap();

    // Customer 14000 - mid
    writeln!(file, "536373,22111,SCOTTIE DOG HOT WATER BOTTLE,10,2011-06-01 11:00:00,4.95,14000,United Kingdom").unwrap();
    writeln!(file, "536374,22112,CHOCOLATE HOT WATER BOTTLE,5,2011-09-01 11:00:00,4.95,14000,United Kingdom").unwrap();

    // Anonymous row, dropped before RFM
    writeln!(file, "536375,22113,GREY HEART HOT WATER BOTTLE,3,2011-12-09 12:50:00,3.75,,United Kingdom").unwrap();

    file.flush().unwrap();
    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();
    assert_eq!(rows.len(), 12);

    let seg = run_segmentation(&rows, &KMeansParams::new(3, 42)).unwrap();

    assert_eq!(seg.rfm.len(), 5);
    assert_eq!(seg.standardized.shape(), &[5, 3]);

    let model = seg.model.as_ref().unwrap();
    assert_eq!(model.labels.len(), 5);
    assert_eq!(model.centroids.shape(), &[3, 3]);
    assert!(model.labels.iter().all(|&l| l < 3));
    assert!(model.cluster_sizes().iter().all(|&s| s > 0));
    assert!(model.inertia.is_finite() && model.inertia >= 0.0);

    let labels: Vec<usize> = seg.summaries.iter().map(|s| s.cluster).collect();
    assert_eq!(labels, vec![0, 1, 2]);
    assert_eq!(seg.summaries.iter().map(|s| s.customers).sum::<usize>(), 5);
}

#[test]
fn test_rfm_values_from_csv() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();
    let rfm = build_rfm(&rows);

    // latest named-customer purchase is 2011-12-08 12:00, the anonymous
    // row is dropped and does not move the snapshot
    let snapshot = rfm.snapshot.unwrap();
    assert_eq!(snapshot.to_string(), "2011-12-09 12:00:00");

    let recent = rfm.get(&CustomerId::new("12345")).unwrap();
    assert_eq!(recent.recency, 1);
    assert_eq!(recent.frequency, 2);
    assert!((recent.monetary - (2.0 * 7.65 + 12.0 * 1.25 + 96.0 * 1.85)).abs() < 1e-9);

    let returned = rfm.get(&CustomerId::new("98765")).unwrap();
    assert_eq!(returned.frequency, 2);
    assert!(returned.monetary.abs() < 1e-9);

    let ids: Vec<&str> = rfm.records.iter().map(|r| r.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["12345", "13047", "14000", "17850", "98765"]);
}

#[test]
fn test_reproducible_labels() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();
    let standardized = standardize(&build_rfm(&rows));

    for seed in [0, 1, 42, 12345] {
        let a = cluster(&standardized.matrix.view(), 2, seed).unwrap();
        let b = cluster(&standardized.matrix.view(), 2, seed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.iter().collect::<HashSet<_>>().len(), 2);
    }
}

#[test]
fn test_row_order_does_not_change_segments() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();
    let mut reversed = rows.clone();
    reversed.reverse();

    let params = KMeansParams::new(3, 7);
    let a = run_segmentation(&rows, &params).unwrap();
    let b = run_segmentation(&reversed, &params).unwrap();

    assert_eq!(a.rfm.len(), b.rfm.len());
    for (x, y) in a.rfm.records.iter().zip(&b.rfm.records) {
        assert_eq!(x.customer_id, y.customer_id);
        assert_eq!((x.recency, x.frequency), (y.recency, y.frequency));
        assert!((x.monetary - y.monetary).abs() < 1e-9);
    }
    assert_eq!(a.labels(), b.labels());
}

#[test]
fn test_k_equals_n() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();
    let standardized = standardize(&build_rfm(&rows));

    let model = fit_kmeans(&standardized.matrix.view(), &KMeansParams::new(5, 42)).unwrap();
    assert!(model.inertia.abs() < 1e-12);

    let rfm = build_rfm(&rows);
    let summaries = summarize(&rfm, &model.labels).unwrap();
    assert_eq!(summaries.len(), 5);
    assert!(summaries.iter().all(|s| s.customers == 1));
}

#[test]
fn test_error_handling_invalid_clusters() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();

    for k in [0, 1, 6] {
        let result = run_segmentation(&rows, &KMeansParams::new(k, 42));
        assert!(matches!(result, Err(SegmentError::InvalidParameter(_))), "k={k}");
    }
}

#[test]
fn test_standardization_round_trip() {
    let test_file = create_test_csv();
    let rows = load_transactions(test_file.path()).unwrap();
    let rfm = build_rfm(&rows);
    let standardized = standardize(&rfm);

    let restored = standardized
        .scaler
        .inverse_transform(&standardized.matrix.view())
        .unwrap();
    for (a, b) in rfm.to_matrix().iter().zip(restored.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_header_only_file_gives_empty_segmentation() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Invoice,Quantity,InvoiceDate,Price,Customer ID").unwrap();
    file.flush().unwrap();

    let rows = load_transactions(file.path()).unwrap();
    assert!(rows.is_empty());

    let seg = run_segmentation(&rows, &KMeansParams::new(4, 42)).unwrap();
    assert!(seg.is_empty());
    assert!(seg.summaries.is_empty());
}
