use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro that derives everything a graph object needs.
///
/// Syntax sugar that expands to:
/// ```ignore
/// #[derive(Debug, Default, isomer_core::GraphObject)]
/// ```
///
/// # Example
///
/// ```ignore
/// use isomer_derive::graph_object;
///
/// #[graph_object]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
/// ```
#[proc_macro_attribute]
pub fn graph_object(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let output = quote! {
        #[derive(
            ::std::fmt::Debug,
            ::std::default::Default,
            ::isomer_core::GraphObject
        )]
        #input
    };

    output.into()
}

/// Derive macro for the `GraphObject` trait.
///
/// Generates `export_fields`, `import_fields`, `set_field` and the `Any`
/// accessors for a struct with named fields. Field types must convert both
/// ways (`Value: From<T>` and `T: FromValue`); non-skipped field types must
/// also implement `Default` and `Clone`.
///
/// # Attributes
///
/// - `#[graph(skip)]` - leave this field out of the document entirely
/// - `#[graph(rename = "name")]` - use a custom field name on the wire
///
/// # Example
///
/// ```ignore
/// use isomer_core::{GraphObject, Handle};
///
/// #[derive(Debug, Default, GraphObject)]
/// struct Track {
///     title: String,
///     #[graph(rename = "runtimeSeconds")]
///     runtime: u32,
///     #[graph(skip)]
///     play_count: u64,
///     next: Option<Handle<Track>>,
/// }
/// ```
#[proc_macro_derive(GraphObject, attributes(graph))]
pub fn derive_graph_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_graph_object_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct FieldSpec<'a> {
    ident: &'a syn::Ident,
    wire_name: String,
}

fn derive_graph_object_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = named_fields(input)?;
    let specs: Vec<FieldSpec> = fields
        .named
        .iter()
        .filter_map(|field| {
            let attrs = parse_field_attrs(&field.attrs);
            if attrs.skip {
                return None;
            }
            let ident = field.ident.as_ref()?;
            let wire_name = attrs.rename.unwrap_or_else(|| ident.to_string());
            Some(FieldSpec { ident, wire_name })
        })
        .collect();

    let bag_ident = if specs.is_empty() {
        quote! { _bag }
    } else {
        quote! { bag }
    };
    let value_ident = if specs.is_empty() {
        quote! { _value }
    } else {
        quote! { value }
    };

    let exports = specs.iter().map(|spec| {
        let ident = spec.ident;
        let wire_name = &spec.wire_name;
        quote! {
            bag.add(
                #wire_name,
                ::isomer_core::Value::from(::std::clone::Clone::clone(&self.#ident)),
            )?;
        }
    });

    let imports = specs.iter().map(|spec| {
        let ident = spec.ident;
        let wire_name = &spec.wire_name;
        quote! {
            self.#ident = bag.get(#wire_name)?;
        }
    });

    let set_arms = specs.iter().map(|spec| {
        let ident = spec.ident;
        let wire_name = &spec.wire_name;
        quote! {
            #wire_name => {
                self.#ident = ::isomer_core::FromValue::from_value(&value)?;
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::isomer_core::GraphObject for #name #ty_generics #where_clause {
            fn export_fields(
                &self,
                #bag_ident: &mut ::isomer_core::FieldBag,
            ) -> ::isomer_core::Result<()> {
                #(#exports)*
                ::std::result::Result::Ok(())
            }

            fn import_fields(
                &mut self,
                #bag_ident: &::isomer_core::FieldBag,
            ) -> ::isomer_core::Result<()> {
                #(#imports)*
                ::std::result::Result::Ok(())
            }

            fn set_field(
                &mut self,
                name: &str,
                #value_ident: ::isomer_core::Value,
            ) -> ::isomer_core::Result<()> {
                match name {
                    #(#set_arms)*
                    _ => {
                        return ::std::result::Result::Err(
                            ::isomer_core::CodecError::UnknownField {
                                type_path: ::std::any::type_name::<Self>(),
                                name: ::std::string::String::from(name),
                            },
                        );
                    }
                }
                ::std::result::Result::Ok(())
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    })
}

fn named_fields(input: &DeriveInput) -> syn::Result<&syn::FieldsNamed> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => Ok(named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "GraphObject requires named fields",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "GraphObject can only be derived for structs",
        )),
    }
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    rename: Option<String>,
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> FieldAttrs {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("graph") {
            continue;
        }

        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            }
            Ok(())
        });
    }

    result
}
