//! `#[module]` - builds a `Module` implementation from an impl block.

use crate::actions::type_name;
use proc_macro::TokenStream;
use quote::quote;
use syn::{
    FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType, Token, ext::IdentExt,
    parse::Parse, parse_macro_input,
};

/// Arguments for the `#[module]` macro.
#[derive(Default)]
pub(crate) struct ModuleArgs {
    /// The module name.
    pub name: Option<LitStr>,
    /// Artifact path of the module entry.
    pub register: Option<LitStr>,
}

impl Parse for ModuleArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "name" => args.name = Some(value),
                "register" => args.register = Some(value),
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

/// What a method of the annotated impl block becomes.
enum Role<'a> {
    Load(&'a ImplItemFn),
    Unload(&'a ImplItemFn),
    Event {
        method: String,
        item: &'a ImplItemFn,
        takes_args: bool,
    },
}

pub(crate) fn module_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ModuleArgs);
    let input = parse_macro_input!(item as ItemImpl);

    match expand(&args, &input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &ModuleArgs, input: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[module] must be placed on an inherent impl block",
        ));
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let name = match &args.name {
        Some(name) => name.clone(),
        None => type_name(self_ty)?,
    };

    let mut load = None;
    let mut unload = None;
    let mut arms = Vec::new();
    for role in collect_roles(input)? {
        match role {
            Role::Load(func) => load = Some(lifecycle("load", func)),
            Role::Unload(func) => unload = Some(lifecycle("unload", func)),
            Role::Event {
                method,
                item,
                takes_args,
            } => {
                let ident = &item.sig.ident;
                let call = if takes_args {
                    quote! { self.#ident(args) }
                } else {
                    quote! { self.#ident() }
                };
                let body = match &item.sig.output {
                    ReturnType::Default => quote! {{
                        #call;
                        ::core::result::Result::Ok(::core::option::Option::None)
                    }},
                    ReturnType::Type(..) => call,
                };
                arms.push(quote! { #method => #body, });
            }
        }
    }

    let registration = match &args.register {
        Some(path) => {
            if !input.generics.params.is_empty() {
                return Err(syn::Error::new_spanned(
                    &input.generics,
                    "generic modules cannot be registered",
                ));
            }
            quote! {
                ::sulfide::inventory::submit! {
                    ::sulfide::artifacts::ArtifactRegistration::module(#path, #name, {
                        fn __sulfide_module() -> ::std::sync::Arc<dyn ::sulfide::Module> {
                            ::std::sync::Arc::new(<#self_ty as ::core::default::Default>::default())
                        }
                        __sulfide_module
                    })
                }
            }
        }
        None => quote! {},
    };

    Ok(quote! {
        #input

        impl #impl_generics ::sulfide::Module for #self_ty #where_clause {
            fn name(&self) -> &str {
                #name
            }

            #load

            #unload

            #[allow(unused_variables)]
            fn notify(
                &self,
                method: &str,
                args: &[::sulfide::Arg<'_>],
            ) -> ::sulfide::HookReturn {
                match method {
                    #(#arms)*
                    _ => ::core::result::Result::Ok(::core::option::Option::None),
                }
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }

        #registration
    })
}

/// Classify the methods of the impl block. Associated functions without a
/// receiver (constructors) are left alone.
fn collect_roles(input: &ItemImpl) -> syn::Result<Vec<Role<'_>>> {
    let mut roles = Vec::new();
    let mut events: Vec<String> = Vec::new();

    for item in &input.items {
        let ImplItem::Fn(func) = item else {
            continue;
        };
        let mut inputs = func.sig.inputs.iter();
        match inputs.next() {
            Some(FnArg::Receiver(receiver)) if receiver.mutability.is_none() => {}
            Some(FnArg::Receiver(receiver)) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "modules are shared; methods must take `&self`",
                ));
            }
            _ => continue,
        }

        let name = func.sig.ident.unraw().to_string();
        match name.as_str() {
            "load" | "unload" => {
                if let Some(arg) = inputs.next() {
                    return Err(syn::Error::new_spanned(
                        arg,
                        format!("`{}` takes no arguments", name),
                    ));
                }
                roles.push(if name == "load" {
                    Role::Load(func)
                } else {
                    Role::Unload(func)
                });
            }
            "name" | "notify" | "as_any" => {
                return Err(syn::Error::new_spanned(
                    &func.sig.ident,
                    format!("`{}` is generated by #[module]", name),
                ));
            }
            _ => {
                let takes_args = match (inputs.next(), inputs.next()) {
                    (None, _) => false,
                    (Some(FnArg::Typed(_)), None) => true,
                    (Some(arg), _) => {
                        return Err(syn::Error::new_spanned(
                            arg,
                            "event methods take at most one argument: `args: &[Arg<'_>]`; \
                             move helpers into a separate impl block",
                        ));
                    }
                };
                if events.contains(&name) {
                    return Err(syn::Error::new_spanned(
                        &func.sig.ident,
                        format!("another method already answers `{}`", name),
                    ));
                }
                events.push(name.clone());
                roles.push(Role::Event {
                    method: name,
                    item: func,
                    takes_args,
                });
            }
        }
    }

    Ok(roles)
}

/// Delegate a lifecycle hook to the inherent method of the same name.
fn lifecycle(hook: &str, func: &ImplItemFn) -> proc_macro2::TokenStream {
    let hook = Ident::new(hook, func.sig.ident.span());
    let ident = &func.sig.ident;
    let body = match &func.sig.output {
        ReturnType::Default => quote! {
            Self::#ident(self);
            ::core::result::Result::Ok(())
        },
        ReturnType::Type(..) => quote! {
            Self::#ident(self).map_err(::core::convert::Into::into)
        },
    };
    quote! {
        fn #hook(&self) -> ::core::result::Result<(), ::sulfide::BoxError> {
            #body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(input: &ItemImpl) -> Vec<String> {
        collect_roles(input)
            .unwrap()
            .into_iter()
            .map(|role| match role {
                Role::Load(_) => "load".to_owned(),
                Role::Unload(_) => "unload".to_owned(),
                Role::Event {
                    method, takes_args, ..
                } => format!("{method}({takes_args})"),
            })
            .collect()
    }

    #[test]
    fn test_parse_args() {
        let args: ModuleArgs = syn::parse_str(r#"name = "audit", register = "modules/audit/module-entry""#).unwrap();
        assert_eq!(args.name.unwrap().value(), "audit");
        assert_eq!(args.register.unwrap().value(), "modules/audit/module-entry");
        assert!(syn::parse_str::<ModuleArgs>(r#"priority = "1""#).is_err());
    }

    #[test]
    fn test_roles() {
        let input: ItemImpl = syn::parse_quote! {
            impl Audit {
                fn new() -> Self { Audit }
                fn load(&self) -> Result<(), BoxError> { Ok(()) }
                fn core_routing_requested(&self, args: &[Arg<'_>]) {}
                fn core_routing_error(&self) -> HookReturn { Ok(None) }
            }
        };
        assert_eq!(
            roles(&input),
            vec!["load", "core_routing_requested(true)", "core_routing_error(false)"]
        );
    }

    #[test]
    fn test_rejects_bad_methods() {
        let mutable: ItemImpl = syn::parse_quote! {
            impl Audit { fn core_routing_error(&mut self) {} }
        };
        assert!(collect_roles(&mutable).is_err());

        let generated: ItemImpl = syn::parse_quote! {
            impl Audit { fn name(&self) -> &str { "x" } }
        };
        assert!(collect_roles(&generated).is_err());

        let helper: ItemImpl = syn::parse_quote! {
            impl Audit { fn format(&self, a: u32, b: u32) -> String { String::new() } }
        };
        assert!(collect_roles(&helper).is_err());
    }
}
