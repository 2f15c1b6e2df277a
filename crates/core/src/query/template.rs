//! Query text generation.

use chrono::NaiveDate;

/// Build the Hive query summarising a provider's purchase transactions.
///
/// `day_count` spans `range_start..=range_end`; transactions are counted
/// from `range_start` onward so the latest date shows how far data reaches.
pub fn transaction_summary_query(
    provider_id: &str,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> String {
    format!(
        r#"
        set hive.execution.engine = tez;
        set fs.s3n.block.size=128000000;
        set fs.s3a.block.size=128000000;

        select datediff(to_date('{end}'), to_date('{start}'))+1 as day_count,
        count(DISTINCT txn_date) as distinct_txn_count,
        MIN(txn_date) AS min_date,
        MAX(txn_date) AS max_date
        from (select cast(txn_dt as date) as txn_date
        from core_shared.transaction
        WHERE provider_id IN ({pid})
        AND txn_type = 'P'
        AND txn_dt >=('{start}')
        group by cast(txn_dt as date)
        ) a
        "#,
        pid = provider_id,
        start = range_start.format("%Y-%m-%d"),
        end = range_end.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_contains_parameters() {
        let query = transaction_summary_query(
            "9876",
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
        );
        assert!(query.contains("WHERE provider_id IN (9876)"));
        assert!(query.contains("datediff(to_date('2024-02-05'), to_date('2023-01-02'))+1"));
        assert!(query.contains("AND txn_dt >=('2023-01-02')"));
        assert!(query.contains("txn_type = 'P'"));
    }
}
