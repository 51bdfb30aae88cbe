//! Fixed vocabularies used by the complexity estimator.

/// Domain-technical terms, matched by substring against lowercased text.
pub const TECHNICAL_TERMS: &[&str] = &[
    // Computer science
    "algorithm",
    "optimization",
    "complexity",
    "architecture",
    "implementation",
    "compilation",
    "recursion",
    "polymorphism",
    "concurrency",
    "distributed",
    "binary",
    "hash",
    "encryption",
    "asynchronous",
    "database",
    "compiler",
    "heuristic",
    "neural network",
    "abstraction",
    "latency",
    // Mathematics
    "derivative",
    "integral",
    "theorem",
    "proof",
    "equation",
    "matrix",
    "logarithm",
    "exponential",
    "probability",
    "statistics",
    "calculus",
    "differential",
    "polynomial",
    "geometric",
    "algebraic",
    "eigenvalue",
    "topology",
    "vector space",
    "induction",
    "bayesian",
    // Physics
    "quantum",
    "relativity",
    "entropy",
    "momentum",
    "acceleration",
    "velocity",
    "energy",
    "electromagnetic",
    "particle",
    "wave",
    "entanglement",
    "photon",
    "electron",
    "nuclear",
    "thermodynamic",
    "gravitational",
    "oscillation",
    "superposition",
    "friction",
    "torque",
    // General science
    "hypothesis",
    "analysis",
    "synthesis",
    "experiment",
    "methodology",
    "variable",
    "correlation",
    "causation",
    "empirical",
    "theoretical",
    "molecular",
    "cellular",
    "genetic",
    "biochemical",
    "evolutionary",
    "photosynthesis",
    "enzyme",
    "catalyst",
    "isotope",
    "metabolism",
    // Economics
    "inflation",
    "elasticity",
    "equilibrium",
    "monetary",
    "fiscal",
    "marginal",
    "macroeconomic",
    "microeconomic",
    "opportunity cost",
    "supply and demand",
    "arbitrage",
    "depreciation",
    "liquidity",
    "externality",
    "oligopoly",
    "comparative advantage",
    "game theory",
    "utility function",
    "interest rate",
    "gross domestic product",
];

/// Question words that call for analysis rather than recall.
pub const ANALYTICAL_WORDS: &[&str] = &[
    "why", "how", "explain", "analyze", "analyse", "evaluate", "compare", "contrast", "justify",
    "critique", "prove", "derive",
];

/// Question words that ask for a simple fact.
pub const FACTUAL_WORDS: &[&str] = &["what", "who", "when", "where", "define"];
