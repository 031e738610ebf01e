//! Logging shortcuts for the state machine.

/// Logs an outbound message.
macro_rules! log_send(
    ($interface:expr, $message_type:expr, $destination:expr) => (
        info!("{}: sending {} to {}", $interface, $message_type, $destination);
    );
);

/// Logs an accepted reply.
macro_rules! log_receive(
    ($interface:expr, $message_type:expr, $source:expr, $state:expr) => (
        info!("{}: received {} from {} in {}", $interface, $message_type, $source, $state);
    );
);

/// Drops a reply that does not belong to the client, logging why.
macro_rules! discard(
    ($interface:expr, $($arg:tt)+) => ({
        trace!("{}: discarding reply: {}", $interface, format_args!($($arg)+));
        return;
    });
);
