// src/sema/types.rs

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Type-argument list of a specialized class. Most generics take one or two
/// arguments, so the common case stays inline.
pub type TyArgs = SmallVec<[Ty; 2]>;

/// Resolved types in the type system.
///
/// A closed algebra: every type a Marten program can mention is one of these
/// eight shapes. Structural equality throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// Instance of a non-generic class, e.g. `Int`
    Raw(String),
    /// Metaclass of a non-generic class; the type of the class constant
    Meta(String),
    /// Metaclass of an unspecialized generic class, e.g. the constant `Pair`
    GenMeta { base: String, params: Vec<String> },
    /// Generic class applied to type arguments, e.g. `Array<Int>`
    Spe { base: String, args: Box<TyArgs> },
    /// Metaclass of a specialized generic class
    SpeMeta { base: String, args: Box<TyArgs> },
    /// Free type parameter inside a generic class body
    Param(String),
    /// Method signature
    Method {
        name: String,
        params: Vec<Ty>,
        ret: Box<Ty>,
    },
    /// Pseudo-type marking the absence of a superclass on the root class
    NoParent,
}

pub fn raw(name: &str) -> Ty {
    Ty::Raw(name.to_string())
}

pub fn meta(name: &str) -> Ty {
    Ty::Meta(name.to_string())
}

pub fn gen_meta(base: &str, params: &[&str]) -> Ty {
    Ty::GenMeta {
        base: base.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn spe(base: &str, args: impl IntoIterator<Item = Ty>) -> Ty {
    Ty::Spe {
        base: base.to_string(),
        args: Box::new(args.into_iter().collect()),
    }
}

pub fn spe_meta(base: &str, args: impl IntoIterator<Item = Ty>) -> Ty {
    Ty::SpeMeta {
        base: base.to_string(),
        args: Box::new(args.into_iter().collect()),
    }
}

pub fn typaram(name: &str) -> Ty {
    Ty::Param(name.to_string())
}

/// Registry name of a specialization, e.g. `Pair<Int,Bool>`.
pub fn spe_name(base: &str, args: &[Ty]) -> String {
    let args: Vec<String> = args.iter().map(Ty::key).collect();
    format!("{}<{}>", base, args.join(","))
}

/// Registry name of a class's metaclass, e.g. `Meta:Pair<Int,Bool>`.
pub fn meta_name(class_name: &str) -> String {
    format!("Meta:{}", class_name)
}

impl Ty {
    /// Canonical string form, used as the specialization cache key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Replace free type parameters by their mapping. Parameters absent from
    /// the map are left in place.
    pub fn substitute(&self, map: &FxHashMap<String, Ty>) -> Ty {
        match self {
            Ty::Param(p) => map.get(p).cloned().unwrap_or_else(|| self.clone()),
            Ty::Spe { base, args } => Ty::Spe {
                base: base.clone(),
                args: Box::new(args.iter().map(|a| a.substitute(map)).collect()),
            },
            Ty::SpeMeta { base, args } => Ty::SpeMeta {
                base: base.clone(),
                args: Box::new(args.iter().map(|a| a.substitute(map)).collect()),
            },
            Ty::Method { name, params, ret } => Ty::Method {
                name: name.clone(),
                params: params.iter().map(|p| p.substitute(map)).collect(),
                ret: Box::new(ret.substitute(map)),
            },
            _ => self.clone(),
        }
    }

    /// The instance type named by a metaclass value: `Meta:T` denotes `T`.
    /// Used to extract type arguments from class constants.
    pub fn instance_ty(&self) -> Option<Ty> {
        match self {
            Ty::Meta(n) => Some(Ty::Raw(n.clone())),
            Ty::SpeMeta { base, args } => Some(Ty::Spe {
                base: base.clone(),
                args: args.clone(),
            }),
            _ => None,
        }
    }

    /// Name of the registry class whose methods this type dispatches to.
    /// `Param`, `Method` and the no-parent sentinel name no class.
    pub fn class_name(&self) -> Option<String> {
        match self {
            Ty::Raw(n) => Some(n.clone()),
            Ty::Meta(n) => Some(meta_name(n)),
            Ty::GenMeta { base, .. } => Some(meta_name(base)),
            Ty::Spe { base, args } => Some(spe_name(base, args)),
            Ty::SpeMeta { base, args } => Some(meta_name(&spe_name(base, args))),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Raw(n) if n == "Void")
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Raw(n) => write!(f, "{}", n),
            Ty::Meta(n) => write!(f, "Meta:{}", n),
            Ty::GenMeta { base, .. } => write!(f, "Meta:{}", base),
            Ty::Spe { base, args } => write!(f, "{}", spe_name(base, args)),
            Ty::SpeMeta { base, args } => write!(f, "Meta:{}", spe_name(base, args)),
            Ty::Param(p) => write!(f, "{}", p),
            Ty::Method { name, params, ret } => {
                write!(f, "{}(", name)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", ret)
            }
            Ty::NoParent => write!(f, "__noparent__"),
        }
    }
}
