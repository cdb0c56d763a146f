/* The named command surface: one `impl Driver` block per command family,
 * all routed through `Driver::command_get`/`command_set` in `transaction.rs`.
 * Argument range-checking happens here, before any byte reaches the wire. */
mod image;
mod notepad;
mod random;
mod system;
mod template;
