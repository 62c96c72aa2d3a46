// handlers/mod.rs - Handler tiers
//
// Public (no session) → Session (any resolved role) → Admin (role admin)
//
// Every request passes through the session middleware first; handlers decide
// which tier they belong to by how they resolve the session.
pub mod admin; // Tier 3: /api/admin/cache/*
pub mod dashboard; // Tier 2: /api/dashboard/:query
pub mod public; // Tier 1: /, /health
pub mod session; // Tier 2: /api/auth/permissions, /api/pages/:page
