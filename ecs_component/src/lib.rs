// ecs_component/src/lib.rs
extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;
use syn::parse::ParseStream;
use syn::parse::Parse;
use syn::Attribute;
use syn::DeriveInput;
use syn::Fields;
use syn::GenericArgument;
use syn::LitStr;
use syn::PathArguments;
use syn::Token;
use syn::Data;
use syn::Type;

struct EcsComponentArgs {
    name: Option<LitStr>,
}

impl Parse for EcsComponentArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _eq: Token![=] = input.parse()?;

            if ident == "name" {
                name = Some(input.parse()?);
            } else {
                return Err(syn::Error::new_spanned(ident, "Expected 'name'"));
            }

            if input.peek(Token![,]) {
                let _: Token![,] = input.parse()?;
            }
        }

        Ok(EcsComponentArgs { name })
    }
}

/// `#[ecs_component]` – generates the `ComponentType` impl (type name + field
/// schema) and submits the component to the registration list.
///
/// The type name written into scene files defaults to the struct name and can
/// be overridden with `#[ecs_component(name = "...")]`.
#[proc_macro_attribute]
pub fn ecs_component(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = if args.is_empty() {
        EcsComponentArgs { name: None }
    } else {
        parse_macro_input!(args as EcsComponentArgs)
    };

    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "ecs_component does not support generic components",
        )
        .to_compile_error()
        .into();
    }

    // Extract the struct data
    let struct_data = match &input.data {
        Data::Struct(s) => s,
        _ => {
            return syn::Error::new_spanned(name, "ecs_component only works on structs")
                .to_compile_error()
                .into();
        }
    };

    let type_name = match &args.name {
        Some(lit) => lit.value(),
        None => name.to_string(),
    };

    let schema = generate_schema(&struct_data.fields);

    let expanded = quote! {
        #input

        impl crate::ecs::component_registry::ComponentType for #name {
            const TYPE_NAME: &'static str = #type_name;

            fn schema() -> &'static [crate::ecs::component_registry::FieldSchema] {
                #schema
            }
        }

        // Registry submission
        inventory::submit! {
            crate::ecs::component_registry::ComponentRegistration {
                describe: crate::ecs::component_registry::ComponentDescriptor::of::<#name>,
            }
        }
    };

    TokenStream::from(expanded)
}

fn generate_schema(fields: &Fields) -> proc_macro2::TokenStream {
    match fields {
        // Normal struct { a: T, b: U }
        Fields::Named(named) => {
            let field_schemas = named
                .named
                .iter()
                .filter(|f| !is_skipped(&f.attrs))
                .filter_map(|f| {
                    let ident = f.ident.as_ref()?;
                    let field_name = serde_rename(&f.attrs).unwrap_or_else(|| ident.to_string());
                    let kind = field_kind(&f.ty);
                    Some(quote! {
                        crate::ecs::component_registry::FieldSchema {
                            name: #field_name,
                            kind: crate::ecs::component_registry::FieldKind::#kind,
                        }
                    })
                });

            quote! {
                &[#(#field_schemas),*]
            }
        }

        // Tuple and unit structs carry no named fields to persist.
        Fields::Unnamed(_) | Fields::Unit => {
            quote! { &[] }
        }
    }
}

/// True when the field carries `#[serde(skip)]`.
fn is_skipped(attrs: &[Attribute]) -> bool {
    let mut skipped = false;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skipped = true;
            } else if meta.input.peek(Token![=]) {
                // Consume the value of `key = "..."` style arguments.
                let _ = meta.value()?.parse::<syn::Expr>()?;
            }
            Ok(())
        });
    }
    skipped
}

/// Returns the value of `#[serde(rename = "...")]` if present.
fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
            } else if meta.input.peek(Token![=]) {
                let _ = meta.value()?.parse::<syn::Expr>()?;
            }
            Ok(())
        });
    }
    rename
}

fn field_kind(ty: &Type) -> proc_macro2::TokenStream {
    match ty {
        syn::Type::Path(p) => {
            let Some(last) = p.path.segments.last() else {
                return quote! { Table };
            };
            let ident = last.ident.to_string();
            match ident.as_str() {
                "f32" | "f64" | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32"
                | "u64" | "usize" | "isize" => quote! { Number },
                "bool" => quote! { Bool },
                "String" | "PathBuf" => quote! { Text },
                "Vec2" => quote! { Vec2 },
                "AssignableRef" => quote! { Reference },
                "Vec" => quote! { List },
                // Optional fields take the kind of their payload.
                "Option" => match &last.arguments {
                    PathArguments::AngleBracketed(generic) => match generic.args.first() {
                        Some(GenericArgument::Type(inner)) => field_kind(inner),
                        _ => quote! { Table },
                    },
                    _ => quote! { Table },
                },
                // Id types EntityId, ComponentId, etc.
                other if other.ends_with("Id") => quote! { Reference },
                _ => quote! { Table },
            }
        }
        syn::Type::Reference(r)
            if matches!(r.elem.as_ref(), syn::Type::Path(p) if p.path.is_ident("str")) =>
        {
            quote! { Text }
        }
        syn::Type::Array(_) | syn::Type::Slice(_) => quote! { List },
        _ => quote! { Table },
    }
}
