use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Teardown = Box<dyn FnOnce()>;

/// Cleanup returned by an effect body. The hooks runtime calls it before the
/// effect re-runs and when the owning component unmounts.
#[derive(Clone, Default)]
pub struct Dispose(Rc<RefCell<Option<Teardown>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// A cleanup with nothing to do, for effects that only run.
    pub fn none() -> Self {
        Self::default()
    }

    /// True until the teardown has run.
    pub fn is_armed(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Runs the teardown; later calls do nothing.
    pub fn run(&self) {
        let teardown = self.0.borrow_mut().take();
        if let Some(f) = teardown {
            f()
        }
    }
}

impl fmt::Debug for Dispose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dispose").field(&self.is_armed()).finish()
    }
}

impl From<()> for Dispose {
    fn from(_: ()) -> Self {
        Dispose::none()
    }
}

/// Wraps the teardown an effect body hands back.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}
