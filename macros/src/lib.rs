//! Derive macros for Daybook
//!
//! This crate provides procedural macros that remove boilerplate from the
//! action and state types driven by Daybook reducers.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Classifies action variants as user intents or server outcomes
//! - `#[derive(State)]` - Generates request-generation accessors for stale-response guards
//!
//! # Example
//!
//! ```ignore
//! use daybook_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum DayAction {
//!     #[intent]
//!     AddTodo { text: String },
//!
//!     #[outcome]
//!     TodoCreated { todo: Todo },
//! }
//!
//! // Generated methods:
//! assert!(DayAction::AddTodo { text: "milk".into() }.is_intent());
//! assert_eq!(DayAction::AddTodo { text: "milk".into() }.name(), "AddTodo");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident};

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_intent()` - Returns true if this variant is a user intent
/// - `is_outcome()` - Returns true if this variant reports a server outcome
/// - `name()` - Returns the variant name, for logs and metrics labels
///
/// # Attributes
///
/// - `#[intent]` - Mark a variant as a user intent
/// - `#[outcome]` - Mark a variant as a server outcome
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[intent]` and `#[outcome]` attributes
#[proc_macro_derive(Action, attributes(intent, outcome))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut intent_arms = Vec::new();
    let mut outcome_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_intent = has_attribute(&variant.attrs, "intent");
        let is_outcome = has_attribute(&variant.attrs, "outcome");

        if is_intent && is_outcome {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[intent] and #[outcome]",
            )
            .to_compile_error()
            .into();
        }

        let pattern = variant_pattern(&variant.ident, &variant.fields);
        let variant_name = variant.ident.to_string();

        if is_intent {
            intent_arms.push(quote! { #pattern => true, });
        }
        if is_outcome {
            outcome_arms.push(quote! { #pattern => true, });
        }
        name_arms.push(quote! { #pattern => #variant_name, });
    }

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a user intent
            #[must_use]
            pub const fn is_intent(&self) -> bool {
                match self {
                    #(#intent_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action reports a server outcome
            #[must_use]
            pub const fn is_outcome(&self) -> bool {
                match self {
                    #(#outcome_arms)*
                    _ => false,
                }
            }

            /// Returns the variant name of this action
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Derive macro for State structs
///
/// Generates request-generation helpers when a `u64` field is marked with
/// `#[generation]`. A generation identifies the most recent outstanding
/// request for a collection; responses tagged with an older generation are
/// stale and must be discarded.
///
/// Generated methods:
/// - `generation()` - The current generation
/// - `next_generation()` - Advance and return the new generation
/// - `is_current_generation(g)` - Whether `g` is still the latest
///
/// # Attributes
///
/// - `#[generation]` - Mark a field as the generation counter
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-struct type
/// - The `#[generation]` field is unnamed
///
/// # Example
///
/// ```ignore
/// use daybook_macros::State;
///
/// #[derive(State, Clone, Debug, Default)]
/// struct DayState {
///     pub todos: Vec<Todo>,
///     #[generation]
///     pub load_generation: u64,
/// }
/// ```
#[proc_macro_derive(State, attributes(generation))]
pub fn derive_state(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(State)] can only be used on structs")
            .to_compile_error()
            .into();
    };

    let Some(field) = data_struct
        .fields
        .iter()
        .find(|field| has_attribute(&field.attrs, "generation"))
    else {
        return TokenStream::new();
    };

    let Some(field_name) = field.ident.as_ref() else {
        return syn::Error::new_spanned(field, "#[generation] requires a named field")
            .to_compile_error()
            .into();
    };

    let expanded = quote! {
        impl #name {
            /// The generation of the most recent outstanding request
            #[must_use]
            pub const fn generation(&self) -> u64 {
                self.#field_name
            }

            /// Advance to a new generation, invalidating older requests
            pub fn next_generation(&mut self) -> u64 {
                self.#field_name = self.#field_name.wrapping_add(1);
                self.#field_name
            }

            /// Returns true if `generation` is still the latest one issued
            #[must_use]
            pub const fn is_current_generation(&self, generation: u64) -> bool {
                self.#field_name == generation
            }
        }
    };

    TokenStream::from(expanded)
}

/// Build a wildcard match pattern for a variant regardless of its field shape
fn variant_pattern(variant: &Ident, fields: &Fields) -> proc_macro2::TokenStream {
    match fields {
        Fields::Named(_) => quote! { Self::#variant { .. } },
        Fields::Unnamed(_) => quote! { Self::#variant(..) },
        Fields::Unit => quote! { Self::#variant },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
