//! `#[actions]` - builds a `Handler` implementation from `do_*` methods.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType, Token, Type, parse::Parse,
    parse_macro_input,
};

/// Arguments for the `#[actions]` macro.
#[derive(Default)]
pub(crate) struct ActionsArgs {
    /// Where unknown actions are redirected.
    pub redirect: Option<LitStr>,
    /// The action used when the request names none.
    pub default: Option<LitStr>,
    /// Artifact path to register the handler at.
    pub register: Option<LitStr>,
}

impl Parse for ActionsArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut args = ActionsArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "redirect" => args.redirect = Some(value),
                "default" => args.default = Some(value),
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

/// One `do_*` method and the canonical name it answers to.
struct Action<'a> {
    method: String,
    item: &'a ImplItemFn,
    takes_context: bool,
}

pub(crate) fn actions_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ActionsArgs);
    let input = parse_macro_input!(item as ItemImpl);

    match expand(&args, &input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &ActionsArgs, input: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[actions] must be placed on an inherent impl block",
        ));
    }

    let actions = collect_actions(input)?;
    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let methods: Vec<&str> = actions.iter().map(|a| a.method.as_str()).collect();
    let responds = if methods.is_empty() {
        quote! { false }
    } else {
        quote! { matches!(method, #(#methods)|*) }
    };
    let arms = actions.iter().map(|action| {
        let method = &action.method;
        let ident = &action.item.sig.ident;
        let call = if action.takes_context {
            quote! { self.#ident(cx) }
        } else {
            quote! { self.#ident() }
        };
        let result = match &action.item.sig.output {
            ReturnType::Default => quote! {{
                #call;
                ::core::result::Result::Ok(::sulfide::Response::Empty)
            }},
            ReturnType::Type(..) => quote! {
                ::sulfide::routing::IntoActionResult::into_action_result(#call)
            },
        };
        quote! { #method => ::core::option::Option::Some(#result), }
    });

    let redirect = optional_str(args.redirect.as_ref());
    let default = optional_str(args.default.as_ref());
    let registration = match &args.register {
        Some(path) => register_handler(path, self_ty, input)?,
        None => quote! {},
    };

    Ok(quote! {
        #input

        impl #impl_generics ::sulfide::Handler for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn responds_to(&self, method: &str) -> bool {
                #responds
            }

            #[allow(unused_variables)]
            fn invoke(
                &mut self,
                method: &str,
                cx: &mut ::sulfide::routing::Context<'_>,
            ) -> ::core::option::Option<::sulfide::routing::ActionResult> {
                match method {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn redirect_target(&self) -> ::core::option::Option<&str> {
                #redirect
            }

            fn default_action(&self) -> ::core::option::Option<&str> {
                #default
            }
        }

        #registration
    })
}

fn collect_actions(input: &ItemImpl) -> syn::Result<Vec<Action<'_>>> {
    let mut actions = Vec::new();

    for item in &input.items {
        let ImplItem::Fn(func) = item else {
            continue;
        };
        let name = func.sig.ident.to_string();
        let Some(rest) = name.strip_prefix("do_") else {
            continue;
        };

        let mut inputs = func.sig.inputs.iter();
        if !matches!(inputs.next(), Some(FnArg::Receiver(_))) {
            return Err(syn::Error::new_spanned(
                &func.sig,
                "action methods must take `&self` or `&mut self`",
            ));
        }
        let takes_context = match (inputs.next(), inputs.next()) {
            (None, _) => false,
            (Some(FnArg::Typed(_)), None) => true,
            (Some(arg), _) => {
                return Err(syn::Error::new_spanned(
                    arg,
                    "action methods take at most one argument: `cx: &mut Context<'_>`",
                ));
            }
        };

        let method = action_method(rest).ok_or_else(|| {
            syn::Error::new_spanned(&func.sig.ident, "action method has no action name")
        })?;
        if actions.iter().any(|a: &Action<'_>| a.method == method) {
            return Err(syn::Error::new_spanned(
                &func.sig.ident,
                format!("another method already answers `{}`", method),
            ));
        }

        actions.push(Action {
            method,
            item: func,
            takes_context,
        });
    }

    Ok(actions)
}

/// `other_action` → `doOtherAction`.
fn action_method(snake: &str) -> Option<String> {
    let mut method = String::from("do");
    for part in snake.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            method.extend(first.to_uppercase());
            method.push_str(chars.as_str());
        }
    }
    (method.len() > 2).then_some(method)
}

fn optional_str(value: Option<&LitStr>) -> proc_macro2::TokenStream {
    match value {
        Some(lit) => quote! { ::core::option::Option::Some(#lit) },
        None => quote! { ::core::option::Option::None },
    }
}

fn register_handler(
    path: &LitStr,
    self_ty: &Type,
    input: &ItemImpl,
) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic handlers cannot be registered",
        ));
    }
    let type_name = type_name(self_ty)?;

    Ok(quote! {
        ::sulfide::inventory::submit! {
            ::sulfide::artifacts::ArtifactRegistration::handler(#path, #type_name, {
                fn __sulfide_handler() -> ::std::boxed::Box<dyn ::sulfide::Handler> {
                    ::std::boxed::Box::new(<#self_ty as ::core::default::Default>::default())
                }
                __sulfide_handler
            })
        }
    })
}

/// The last path segment of `ty` as a string literal.
pub(crate) fn type_name(ty: &Type) -> syn::Result<LitStr> {
    match ty {
        Type::Path(path) => match path.path.segments.last() {
            Some(segment) => Ok(LitStr::new(
                &segment.ident.to_string(),
                segment.ident.span(),
            )),
            None => Err(syn::Error::new_spanned(ty, "expected a named type")),
        },
        _ => Err(syn::Error::new_spanned(ty, "expected a named type")),
    }
}
