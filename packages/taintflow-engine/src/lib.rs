/*
 * Taintflow - Static Taint Reachability Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/   : Common models (facts, spans, budget)
 * - features/ : Vertical slices (parsing -> facts -> propagation/reachability -> reporting)
 * - pipeline/ : Per-file orchestration, parallel batch driver
 * - config/   : Source/sink identifier lists, budget presets
 *
 * Given parsed source of a package, decides whether data originating at a
 * source API can reach a sink API without interposed sanitization, and emits
 * the finding as a structured report. Deliberately unsound and incomplete:
 * bounded, practical detection over formal verification.
 */

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration
pub mod config;

/// Error types
pub mod errors;

// Re-exports for the public API
pub use config::{AnalysisConfig, BudgetConfig};
pub use errors::{Result, TaintflowError};
pub use features::parsing::infrastructure::SourceLanguage;
pub use features::reporting::{FileReport, Flow, QualifiedName, Summary};
pub use features::taint_propagation::domain::ClassificationState;
pub use pipeline::{
    analyze_package, analyze_package_cancellable, analyze_parsed, analyze_reachability,
    analyze_source, PackageReport, Strategy,
};
pub use shared::{AnalysisBudget, CancelToken};
