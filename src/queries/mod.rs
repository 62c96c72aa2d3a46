//! Catalog of the named analytical queries the dashboard may run
//!
//! Each query declares the page that gates it, the cache tags its results
//! live under, and how long a result stays fresh.

use serde::{Deserialize, Serialize};

use crate::cache::CacheTag;
use crate::permissions::pages::{self, PageId};

/// Freshness class for cached results; durations come from config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Record-level views that should track the warehouse closely
    Realtime,
    /// Aggregates refreshed by the scheduled loads
    Standard,
    /// Slow-moving lookups such as filter option lists
    Reference,
}

#[derive(Debug)]
pub struct QueryDefinition {
    pub name: &'static str,
    pub page: PageId,
    pub tags: &'static [CacheTag],
    pub ttl_class: TtlClass,
    /// Column the date range applies to
    pub date_column: &'static str,
    /// SQL with a `{where}` placeholder for the compiled filter
    pub sql: &'static str,
}

const FUNNEL_TAGS: &[CacheTag] = &[CacheTag::Dashboard, CacheTag::FunnelMetrics];
const DETAIL_TAGS: &[CacheTag] = &[CacheTag::Dashboard, CacheTag::PipelineDetail];

pub static CATALOG: &[QueryDefinition] = &[
    QueryDefinition {
        name: "funnel_summary",
        page: pages::FUNNEL_PERFORMANCE,
        tags: FUNNEL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT COUNT(*) FILTER (WHERE is_contacted) AS contacted, \
              COUNT(*) FILTER (WHERE is_mql) AS mqls, \
              COUNT(*) FILTER (WHERE is_sql) AS sqls, \
              COUNT(*) FILTER (WHERE is_sqo) AS sqos, \
              COUNT(*) FILTER (WHERE is_joined) AS joined, \
              COALESCE(SUM(opportunity_aum), 0) AS pipeline_aum \
              FROM vw_funnel_master WHERE {where}",
    },
    QueryDefinition {
        name: "conversion_rates",
        page: pages::FUNNEL_PERFORMANCE,
        tags: FUNNEL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT \
              SUM(contacted_to_mql_progression)::float / NULLIF(SUM(eligible_for_contacted_conversions), 0) AS contacted_to_mql, \
              SUM(mql_to_sql_progression)::float / NULLIF(SUM(eligible_for_mql_conversions), 0) AS mql_to_sql, \
              SUM(sql_to_sqo_progression)::float / NULLIF(SUM(eligible_for_sql_conversions), 0) AS sql_to_sqo, \
              SUM(sqo_to_joined_progression)::float / NULLIF(SUM(eligible_for_sqo_conversions), 0) AS sqo_to_joined \
              FROM vw_funnel_master WHERE {where}",
    },
    QueryDefinition {
        name: "conversion_trends",
        page: pages::FUNNEL_PERFORMANCE,
        tags: FUNNEL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT date_trunc('month', filter_date) AS period, \
              COUNT(*) FILTER (WHERE is_sql) AS sqls, \
              COUNT(*) FILTER (WHERE is_sqo) AS sqos, \
              COUNT(*) FILTER (WHERE is_joined) AS joined \
              FROM vw_funnel_master WHERE {where} GROUP BY 1 ORDER BY 1",
    },
    QueryDefinition {
        name: "channel_performance",
        page: pages::FUNNEL_PERFORMANCE,
        tags: FUNNEL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT channel_grouping_name AS channel, \
              COUNT(*) FILTER (WHERE is_sql) AS sqls, \
              COUNT(*) FILTER (WHERE is_sqo) AS sqos, \
              COUNT(*) FILTER (WHERE is_joined) AS joined \
              FROM vw_funnel_master WHERE {where} GROUP BY 1 ORDER BY 2 DESC",
    },
    QueryDefinition {
        name: "source_performance",
        page: pages::FUNNEL_PERFORMANCE,
        tags: FUNNEL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT original_source AS source, channel_grouping_name AS channel, \
              COUNT(*) FILTER (WHERE is_sql) AS sqls, \
              COUNT(*) FILTER (WHERE is_sqo) AS sqos, \
              COUNT(*) FILTER (WHERE is_joined) AS joined \
              FROM vw_funnel_master WHERE {where} GROUP BY 1, 2 ORDER BY 3 DESC",
    },
    QueryDefinition {
        name: "detail_records",
        page: pages::FUNNEL_PERFORMANCE,
        tags: DETAIL_TAGS,
        ttl_class: TtlClass::Realtime,
        date_column: "filter_date",
        sql: "SELECT primary_key, advisor_name, stage_name, sga_owner_name, sgm_owner_name, \
              channel_grouping_name, original_source, opportunity_aum, filter_date \
              FROM vw_funnel_master WHERE {where} ORDER BY filter_date DESC LIMIT 50000",
    },
    QueryDefinition {
        name: "open_pipeline",
        page: pages::OPEN_PIPELINE,
        tags: DETAIL_TAGS,
        ttl_class: TtlClass::Realtime,
        date_column: "opp_created_date",
        sql: "SELECT stage_name AS stage, COUNT(*) AS opportunities, \
              COALESCE(SUM(opportunity_aum), 0) AS aum \
              FROM vw_funnel_master WHERE is_open_pipeline AND {where} GROUP BY 1",
    },
    QueryDefinition {
        name: "sga_leaderboard",
        page: pages::SGA_HUB,
        tags: &[CacheTag::SgaHub],
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT sga_owner_name AS sga, \
              COUNT(*) FILTER (WHERE is_sqo) AS sqos, \
              COUNT(*) FILTER (WHERE is_initial_call_scheduled) AS initial_calls \
              FROM vw_funnel_master WHERE {where} GROUP BY 1 ORDER BY 2 DESC",
    },
    QueryDefinition {
        name: "sgm_quota_progress",
        page: pages::SGM_HUB,
        tags: &[CacheTag::SgmHub],
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT sgm_owner_name AS sgm, \
              COUNT(*) FILTER (WHERE is_joined) AS joined, \
              COALESCE(SUM(opportunity_aum) FILTER (WHERE is_joined), 0) AS joined_aum \
              FROM vw_funnel_master WHERE {where} GROUP BY 1 ORDER BY 3 DESC",
    },
    QueryDefinition {
        name: "gc_hub_summary",
        page: pages::GC_HUB,
        tags: &[CacheTag::GcHubSync],
        ttl_class: TtlClass::Standard,
        date_column: "period_start",
        sql: "SELECT advisor_name, period_start, revenue, commissions \
              FROM gc_advisor_period_data WHERE {where} ORDER BY period_start DESC",
    },
    QueryDefinition {
        name: "recruiter_pipeline",
        page: pages::RECRUITER_HUB,
        tags: DETAIL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT external_agency AS agency, stage_name AS stage, COUNT(*) AS candidates \
              FROM vw_funnel_master WHERE external_agency IS NOT NULL AND {where} GROUP BY 1, 2",
    },
    QueryDefinition {
        name: "capital_partner_summary",
        page: pages::CAPITAL_PARTNER_HUB,
        tags: FUNNEL_TAGS,
        ttl_class: TtlClass::Standard,
        date_column: "filter_date",
        sql: "SELECT date_trunc('quarter', filter_date) AS quarter, \
              COUNT(*) FILTER (WHERE is_joined) AS joined, \
              COALESCE(SUM(opportunity_aum) FILTER (WHERE is_joined), 0) AS joined_aum \
              FROM vw_funnel_master WHERE {where} GROUP BY 1 ORDER BY 1",
    },
    QueryDefinition {
        name: "filter_options",
        page: pages::FUNNEL_PERFORMANCE,
        tags: &[CacheTag::FilterOptions],
        ttl_class: TtlClass::Reference,
        date_column: "filter_date",
        sql: "SELECT array_agg(DISTINCT channel_grouping_name) AS channels, \
              array_agg(DISTINCT original_source) AS sources, \
              array_agg(DISTINCT sga_owner_name) AS sgas, \
              array_agg(DISTINCT sgm_owner_name) AS sgms \
              FROM vw_funnel_master WHERE {where}",
    },
];

pub fn find(name: &str) -> Option<&'static QueryDefinition> {
    CATALOG.iter().find(|query| query.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = CATALOG.iter().map(|q| q.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn every_query_has_a_where_placeholder_and_a_tag() {
        for query in CATALOG {
            assert!(query.sql.contains("{where}"), "{} has no placeholder", query.name);
            assert!(!query.tags.is_empty(), "{} has no tags", query.name);
            assert!(pages::name(query.page).is_some(), "{} gated on unknown page", query.name);
        }
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("open_pipeline").map(|q| q.page), Some(pages::OPEN_PIPELINE));
        assert!(find("drop_tables").is_none());
    }
}
