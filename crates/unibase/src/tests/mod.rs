//! Cross-module tests driving pools and scene loading through one context
