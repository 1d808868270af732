#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

#[macro_export]
macro_rules! re {
    ($pat:literal) => {
        $crate::AttributePattern::Regex($crate::regex!($pat))
    };
}

#[macro_export]
macro_rules! exact {
    ($name:literal) => {
        $crate::AttributePattern::Exact($name)
    };
}

#[macro_export]
macro_rules! pred {
    ($p:expr) => {
        $crate::AttributePattern::Predicate($p)
    };
}

#[macro_export]
macro_rules! cascade_rule {
    (
        name: $name:expr,
        pattern: $pattern:expr
        $(, satellites: [ $($sat:expr),* $(,)? ])?
        $(, canonical: [ $($tok:expr),* $(,)? ])?
        $(, pricing_only: [ $($po:expr),* $(,)? ])?
        $(, priority: $priority:expr)?
        $(, dependents: $dependents:expr)?
        , choices: $choices:expr
        $(,)?
    ) => {{
        let dependents: Option<$crate::DependentsFn> = None $(.or(Some($dependents as $crate::DependentsFn)))?;
        $crate::CascadeRule {
            name: $name,
            pattern: $pattern,
            satellites: &[ $($($sat),*)? ],
            choices: $choices,
            dependents: dependents.unwrap_or($crate::standard_dependents),
            canonical: &[ $($($tok),*)? ],
            pricing_only: &[ $($($po),*)? ],
            priority: { 0 $(+ $priority)? },
        }
    }};
}
