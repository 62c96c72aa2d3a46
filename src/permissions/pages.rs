/// Dashboard page identifiers
pub type PageId = u16;

pub const FUNNEL_PERFORMANCE: PageId = 1;
pub const OPEN_PIPELINE: PageId = 3;
pub const SGA_HUB: PageId = 8;
pub const SGM_HUB: PageId = 9;
pub const GC_HUB: PageId = 10;
pub const RECRUITER_HUB: PageId = 12;
pub const CAPITAL_PARTNER_HUB: PageId = 13;
pub const EXPLORE: PageId = 14;
pub const SETTINGS: PageId = 7;

/// Every page the dashboard currently ships
pub const ALL_PAGES: &[PageId] = &[
    FUNNEL_PERFORMANCE,
    OPEN_PIPELINE,
    SETTINGS,
    SGA_HUB,
    SGM_HUB,
    GC_HUB,
    RECRUITER_HUB,
    CAPITAL_PARTNER_HUB,
    EXPLORE,
];

pub fn name(page: PageId) -> Option<&'static str> {
    match page {
        FUNNEL_PERFORMANCE => Some("funnel-performance"),
        OPEN_PIPELINE => Some("open-pipeline"),
        SETTINGS => Some("settings"),
        SGA_HUB => Some("sga-hub"),
        SGM_HUB => Some("sgm-hub"),
        GC_HUB => Some("gc-hub"),
        RECRUITER_HUB => Some("recruiter-hub"),
        CAPITAL_PARTNER_HUB => Some("capital-partner-hub"),
        EXPLORE => Some("explore"),
        _ => None,
    }
}
