//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context and macros for telemetry publishing."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Context-enriched wrappers around `tracing::event!`. Extra `key = value`
//! pairs may follow the context and precede the format string.

/// Emit an informational log enriched with telemetry context.
#[macro_export]
macro_rules! ems_info {
    (context = $ctx:expr, $($key:ident = $value:expr,)* $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            site = ctx.site.unwrap_or_default(),
            device = ctx.device.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            transport = ctx.transport.unwrap_or(""),
            $($key = $value,)*
            message = %format_args!($fmt $(, $arg)*)
        );
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::ems_info!(context = $crate::LogContext::default(), $fmt $(, $arg)*)
    }};
}

/// Emit a debug log enriched with telemetry context.
#[macro_export]
macro_rules! ems_debug {
    (context = $ctx:expr, $($key:ident = $value:expr,)* $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            site = ctx.site.unwrap_or_default(),
            device = ctx.device.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            transport = ctx.transport.unwrap_or(""),
            $($key = $value,)*
            message = %format_args!($fmt $(, $arg)*)
        );
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::ems_debug!(context = $crate::LogContext::default(), $fmt $(, $arg)*)
    }};
}

/// Emit a warning log enriched with telemetry context.
#[macro_export]
macro_rules! ems_warn {
    (context = $ctx:expr, $($key:ident = $value:expr,)* $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            site = ctx.site.unwrap_or_default(),
            device = ctx.device.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            transport = ctx.transport.unwrap_or(""),
            $($key = $value,)*
            message = %format_args!($fmt $(, $arg)*)
        );
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::ems_warn!(context = $crate::LogContext::default(), $fmt $(, $arg)*)
    }};
}

/// Emit an error log enriched with telemetry context.
#[macro_export]
macro_rules! ems_error {
    (context = $ctx:expr, $($key:ident = $value:expr,)* $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            site = ctx.site.unwrap_or_default(),
            device = ctx.device.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            transport = ctx.transport.unwrap_or(""),
            $($key = $value,)*
            message = %format_args!($fmt $(, $arg)*)
        );
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::ems_error!(context = $crate::LogContext::default(), $fmt $(, $arg)*)
    }};
}
